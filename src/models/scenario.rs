//! Scenario plan, action and result models.
//!
//! A scenario is a named bundle of hypothetical edits against a project or
//! portfolio. Actions are stored exactly as submitted (type tag plus JSON
//! payload) and only become typed [`ActionPayload`] values when the action
//! applicator validates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    ActionId, DateRange, ProjectId, ResultId, ScenarioId, ScenarioSummary, ScopeType, TaskId,
    TeamId, UserId,
};

/// Persisted status flag of a scenario.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    #[default]
    Draft,
    /// Promoted scenario. Orthogonal to whether a result is current.
    Active,
}

/// Derived lifecycle stage of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioLifecycle {
    /// No result, or the result predates the latest action change.
    Draft,
    /// The stored result matches the current actions.
    Computed,
}

/// A named what-if scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioPlan {
    pub id: ScenarioId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub scope_type: ScopeType,
    pub scope_id: String,
    pub status: ScenarioStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every action add/remove.
    #[serde(default)]
    pub actions_revision: u64,
}

impl ScenarioPlan {
    /// Lifecycle stage given the currently stored result.
    pub fn lifecycle(&self, result: Option<&ScenarioResult>) -> ScenarioLifecycle {
        match result {
            Some(r) if r.actions_revision == self.actions_revision => ScenarioLifecycle::Computed,
            _ => ScenarioLifecycle::Draft,
        }
    }

    /// Records an action mutation.
    pub fn touch_actions(&mut self, now: DateTime<Utc>) {
        self.actions_revision += 1;
        self.updated_at = now;
    }
}

/// Input for creating a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub scope_type: ScopeType,
    pub scope_id: String,
    #[serde(default)]
    pub created_by: String,
}

impl NewScenario {
    pub fn new(name: impl Into<String>, scope_type: ScopeType, scope_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            scope_type,
            scope_id: scope_id.into(),
            created_by: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = user.into();
        self
    }
}

/// A stored scenario action, exactly as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioAction {
    pub id: ActionId,
    pub scenario_id: ScenarioId,
    /// Wire tag, e.g. `shift_project`.
    pub action_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Validated action content.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionPayload {
    ShiftProject {
        project_id: ProjectId,
        shift_days: i64,
    },
    ShiftTask {
        task_id: TaskId,
        shift: TaskShift,
    },
    ChangeCapacity {
        target: CapacityTarget,
        delta_percent: f64,
        date_range: Option<DateRange>,
    },
    ChangeBudget {
        project_id: ProjectId,
        delta_amount: f64,
    },
}

impl ActionPayload {
    /// Wire tag of this action kind.
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::ShiftProject { .. } => "shift_project",
            Self::ShiftTask { .. } => "shift_task",
            Self::ChangeCapacity { .. } => "change_capacity",
            Self::ChangeBudget { .. } => "change_budget",
        }
    }
}

/// How a `shift_task` action moves its task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskShift {
    ByDays(i64),
    StartAt(DateTime<Utc>),
}

/// Who a `change_capacity` action applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapacityTarget {
    User(UserId),
    Team(TeamId),
}

/// The single stored result of a scenario. Overwritten on recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub id: ResultId,
    pub scenario_id: ScenarioId,
    pub computed_at: DateTime<Utc>,
    /// Plan revision the result was computed from.
    pub actions_revision: u64,
    pub summary: ScenarioSummary,
    pub warnings: Vec<String>,
}

/// A scenario with its ordered actions and last result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDetails {
    pub plan: ScenarioPlan,
    pub actions: Vec<ScenarioAction>,
    pub result: Option<ScenarioResult>,
    pub lifecycle: ScenarioLifecycle,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn plan() -> ScenarioPlan {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        ScenarioPlan {
            id: "s1".into(),
            name: "Delay launch".into(),
            description: String::new(),
            scope_type: ScopeType::Project,
            scope_id: "P1".into(),
            status: ScenarioStatus::Draft,
            created_by: "alice".into(),
            created_at: now,
            updated_at: now,
            actions_revision: 0,
        }
    }

    fn result_at(revision: u64) -> ScenarioResult {
        ScenarioResult {
            id: "r1".into(),
            scenario_id: "s1".into(),
            computed_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            actions_revision: revision,
            summary: ScenarioSummary::default(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_lifecycle_follows_action_revision() {
        let mut p = plan();
        assert_eq!(p.lifecycle(None), ScenarioLifecycle::Draft);

        let result = result_at(0);
        assert_eq!(p.lifecycle(Some(&result)), ScenarioLifecycle::Computed);

        p.touch_actions(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap());
        assert_eq!(p.actions_revision, 1);
        assert_eq!(p.lifecycle(Some(&result)), ScenarioLifecycle::Draft);
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_value(plan()).unwrap();
        assert_eq!(json["status"], "draft");
        assert_eq!(json["scopeType"], "project");
    }

    #[test]
    fn test_payload_action_type() {
        let p = ActionPayload::ChangeBudget {
            project_id: "P1".into(),
            delta_amount: 10.0,
        };
        assert_eq!(p.action_type(), "change_budget");
    }
}
