//! Before/after comparison models.
//!
//! | Field | Worse when delta is |
//! |-------|---------------------|
//! | capacity hours | negative |
//! | demand hours, overallocated days/users | positive |
//! | critical path slip, baseline drift | positive |
//! | aggregate CPI / SPI | negative |
//!
//! CPI and SPI stay `Option<f64>` on the wire (`null` = no basis); a delta
//! involving a `null` side is itself `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProjectId, Scope};

/// Aggregate figures for one side (before or after) of a scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioStateSnapshot {
    pub total_capacity_hours: f64,
    pub total_demand_hours: f64,
    pub overallocated_days: u32,
    pub overallocated_users: u32,
    #[serde(rename = "aggregateCPI")]
    pub aggregate_cpi: Option<f64>,
    #[serde(rename = "aggregateSPI")]
    pub aggregate_spi: Option<f64>,
    pub critical_path_slip_minutes: i64,
    pub baseline_drift_minutes: i64,
    /// Propagated finish of the scope (max early finish).
    pub project_finish: Option<DateTime<Utc>>,
    pub critical_task_count: u32,
}

/// Element-wise `after - before`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDeltas {
    pub total_capacity_hours_delta: f64,
    pub total_demand_hours_delta: f64,
    pub overallocated_days_delta: i64,
    pub overallocated_users_delta: i64,
    #[serde(rename = "aggregateCPIDelta")]
    pub aggregate_cpi_delta: Option<f64>,
    #[serde(rename = "aggregateSPIDelta")]
    pub aggregate_spi_delta: Option<f64>,
    pub critical_path_slip_minutes_delta: i64,
    pub baseline_drift_minutes_delta: i64,
}

impl ScenarioDeltas {
    pub fn between(before: &ScenarioStateSnapshot, after: &ScenarioStateSnapshot) -> Self {
        Self {
            total_capacity_hours_delta: after.total_capacity_hours - before.total_capacity_hours,
            total_demand_hours_delta: after.total_demand_hours - before.total_demand_hours,
            overallocated_days_delta: i64::from(after.overallocated_days)
                - i64::from(before.overallocated_days),
            overallocated_users_delta: i64::from(after.overallocated_users)
                - i64::from(before.overallocated_users),
            aggregate_cpi_delta: optional_delta(before.aggregate_cpi, after.aggregate_cpi),
            aggregate_spi_delta: optional_delta(before.aggregate_spi, after.aggregate_spi),
            critical_path_slip_minutes_delta: after.critical_path_slip_minutes
                - before.critical_path_slip_minutes,
            baseline_drift_minutes_delta: after.baseline_drift_minutes
                - before.baseline_drift_minutes,
        }
    }
}

fn optional_delta(before: Option<f64>, after: Option<f64>) -> Option<f64> {
    Some(after? - before?)
}

/// A project whose schedule or allocations differ between before and after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactedProject {
    pub project_id: ProjectId,
    /// One-line human-readable explanation.
    pub reason: String,
}

/// Full outcome of a scenario computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub scope: Scope,
    pub before: ScenarioStateSnapshot,
    pub after: ScenarioStateSnapshot,
    pub deltas: ScenarioDeltas,
    pub impacted_projects: Vec<ImpactedProject>,
}

impl Default for ScenarioSummary {
    fn default() -> Self {
        Self {
            scope: Scope::portfolio("", Vec::new()),
            before: ScenarioStateSnapshot::default(),
            after: ScenarioStateSnapshot::default(),
            deltas: ScenarioDeltas::default(),
            impacted_projects: Vec::new(),
        }
    }
}

/// What `compute_scenario` hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeOutcome {
    pub summary: ScenarioSummary,
    pub warnings: Vec<String>,
}
