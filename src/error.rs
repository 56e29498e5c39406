//! Error and warning types.
//!
//! Fatal conditions are [`ScenarioError`] values and abort the whole call;
//! nothing is persisted. Non-fatal conditions are [`ScenarioWarning`] values
//! accumulated next to a best-effort result.

use std::fmt;

use crate::models::{ActionId, ProjectId, TaskId, UserId};

/// Store operation errors with context for debugging.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Entity not found - includes entity type and ID for actionable error messages.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Backend operation failed - includes operation name for tracing.
    #[error("Store error in {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    /// A write would break a store invariant.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    pub fn backend(operation: &'static str, message: impl ToString) -> Self {
        Self::Backend {
            operation,
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Fatal errors of the scenario engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScenarioError {
    /// The dependency graph has a cycle; one of its edges is reported.
    #[error("Cyclic dependency detected at edge {predecessor} -> {successor}")]
    CyclicDependency {
        predecessor: TaskId,
        successor: TaskId,
    },

    /// An action has an unknown type or an unusable payload.
    #[error("Invalid payload for action {action_id}: {reason}")]
    InvalidActionPayload { action_id: ActionId, reason: String },

    /// Structural problems in the schedule other than cycles.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    #[error(transparent)]
    Store(StoreError),
}

impl ScenarioError {
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    pub fn invalid_payload(action_id: &ActionId, reason: impl ToString) -> Self {
        Self::InvalidActionPayload {
            action_id: action_id.clone(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<StoreError> for ScenarioError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity_type, id } => Self::NotFound { entity_type, id },
            other => Self::Store(other),
        }
    }
}

/// Non-fatal conditions collected during a computation.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioWarning {
    /// The scope resolved to no tasks and no allocations.
    EmptyScope { scope_id: String },
    /// A user has allocations but no capacity calendar.
    MissingCapacityData { user_id: UserId },
    /// A `change_capacity` action matched no in-range allocation.
    CapacityChangeWithoutAllocations { action_id: ActionId },
    /// An action targets an entity outside the scope.
    UnknownActionTarget { action_id: ActionId, target: String },
    /// A shift would move a record outside the representable date range,
    /// so the record was left where it was.
    ShiftOutOfRange { action_id: ActionId, target: String },
    /// A project has no cost data, so earned value skips it.
    MissingFinancials { project_id: ProjectId },
}

impl fmt::Display for ScenarioWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyScope { scope_id } => {
                write!(f, "Scope {scope_id} has no tasks or allocations; summary is zeroed")
            }
            Self::MissingCapacityData { user_id } => write!(
                f,
                "No capacity data for user {user_id}; excluded from capacity figures"
            ),
            Self::CapacityChangeWithoutAllocations { action_id } => write!(
                f,
                "Capacity change action {action_id} had no in-range allocations to affect"
            ),
            Self::UnknownActionTarget { action_id, target } => {
                write!(f, "Action {action_id} targets {target}, which is not in scope")
            }
            Self::ShiftOutOfRange { action_id, target } => write!(
                f,
                "Action {action_id} would move {target} out of the supported date range; left unchanged"
            ),
            Self::MissingFinancials { project_id } => write!(
                f,
                "No financial data for project {project_id}; excluded from earned value"
            ),
        }
    }
}

/// Accumulates warnings in order, dropping exact repeats.
#[derive(Debug, Clone, Default)]
pub struct Warnings(Vec<ScenarioWarning>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: ScenarioWarning) {
        if !self.0.contains(&warning) {
            tracing::warn!(warning = %warning, "Scenario warning");
            self.0.push(warning);
        }
    }

    pub fn extend(&mut self, warnings: impl IntoIterator<Item = ScenarioWarning>) {
        for w in warnings {
            self.push(w);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScenarioWarning> {
        self.0.iter()
    }

    /// Renders the warnings for a result payload.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err: ScenarioError = StoreError::not_found("Scenario", "s1").into();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Scenario not found: s1");
    }

    #[test]
    fn test_backend_error_stays_store_error() {
        let err: ScenarioError = StoreError::backend("save_result", "disk full").into();
        assert!(matches!(err, ScenarioError::Store(_)));
        assert_eq!(err.to_string(), "Store error in save_result: disk full");
    }

    #[test]
    fn test_cyclic_error_names_edge() {
        let err = ScenarioError::CyclicDependency {
            predecessor: "C".into(),
            successor: "A".into(),
        };
        assert_eq!(err.to_string(), "Cyclic dependency detected at edge C -> A");
    }

    #[test]
    fn test_warnings_dedup() {
        let mut w = Warnings::new();
        w.push(ScenarioWarning::MissingCapacityData {
            user_id: "u1".into(),
        });
        w.push(ScenarioWarning::MissingCapacityData {
            user_id: "u1".into(),
        });
        assert_eq!(w.to_strings().len(), 1);
        assert!(w.to_strings()[0].contains("u1"));
    }
}
