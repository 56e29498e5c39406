//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::analysis::DEFAULT_CRITICAL_TOLERANCE_MINUTES;

/// Tunables of the scenario engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Tasks with less total float than this are critical.
    pub critical_float_tolerance_minutes: i64,
    /// How far past the as-of date open-ended allocations are assumed to run.
    pub open_allocation_horizon_days: i64,
    /// Slack when comparing summed allocation percent to capacity.
    pub overallocation_epsilon: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            critical_float_tolerance_minutes: DEFAULT_CRITICAL_TOLERANCE_MINUTES,
            open_allocation_horizon_days: 90,
            overallocation_epsilon: 1e-9,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `SCENARIO_*` environment variables.
    ///
    /// Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_i64("SCENARIO_CRITICAL_TOLERANCE_MINUTES") {
            config.critical_float_tolerance_minutes = v;
        }
        if let Some(v) = env_i64("SCENARIO_OPEN_HORIZON_DAYS") {
            config.open_allocation_horizon_days = v;
        }
        config
    }
}

fn env_i64(key: &str) -> Option<i64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "Ignoring unparsable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.critical_float_tolerance_minutes, 1440);
        assert_eq!(config.open_allocation_horizon_days, 90);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"openAllocationHorizonDays": 30}"#).unwrap();
        assert_eq!(config.open_allocation_horizon_days, 30);
        assert_eq!(config.critical_float_tolerance_minutes, 1440);
    }
}
