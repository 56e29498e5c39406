//! Baseline and earned value record models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{BaselineId, EvSnapshotId, ProjectId, TaskId};

/// A frozen copy of one task at baseline creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineTask {
    pub task_id: TaskId,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Whether the task was on the critical path when frozen.
    pub is_critical: bool,
}

/// A frozen project schedule used as a fixed comparison point.
///
/// Immutable once created except for `is_active`; at most one baseline per
/// project is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub id: BaselineId,
    pub project_id: ProjectId,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub tasks: Vec<BaselineTask>,
}

impl Baseline {
    pub fn task(&self, task_id: &TaskId) -> Option<&BaselineTask> {
        self.tasks.iter().find(|t| &t.task_id == task_id)
    }

    /// Latest baseline end.
    pub fn finish(&self) -> Option<DateTime<Utc>> {
        self.tasks.iter().map(|t| t.end).max()
    }
}

/// Input for creating a baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBaseline {
    pub name: String,
    #[serde(default)]
    pub set_active: bool,
}

impl NewBaseline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            set_active: false,
        }
    }

    pub fn active(mut self) -> Self {
        self.set_active = true;
        self
    }
}

/// Per-task comparison outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VarianceStatus {
    OnTrack,
    Late,
    Early,
    /// Present in the baseline, gone from the current schedule.
    TaskRemoved,
}

/// Variance of one baseline task against the current schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskVariance {
    pub task_id: TaskId,
    pub title: String,
    pub baseline_end: DateTime<Utc>,
    pub current_end: Option<DateTime<Utc>>,
    /// `current end - baseline end`. `None` for removed tasks.
    pub end_variance_minutes: Option<i64>,
    pub start_variance_minutes: Option<i64>,
    pub is_critical_in_baseline: bool,
    pub status: VarianceStatus,
}

/// Outcome of comparing a baseline to a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineCompareResult {
    pub baseline_id: BaselineId,
    pub project_id: ProjectId,
    pub tasks: Vec<TaskVariance>,
    /// Current tasks the baseline does not know about.
    pub added_task_ids: Vec<TaskId>,
    pub count_late: u32,
    pub max_slip_minutes: i64,
    pub critical_path_slip_minutes: i64,
    /// Current finish minus baseline finish.
    pub finish_variance_minutes: Option<i64>,
}

/// Earned value figures for a project as of a date.
///
/// Ratios are `None` when their denominator is zero; they are never
/// infinite, NaN or a sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedValueData {
    pub project_id: ProjectId,
    pub as_of: NaiveDate,
    /// Budget at completion.
    pub bac: f64,
    /// Planned value.
    pub pv: f64,
    /// Earned value.
    pub ev: f64,
    /// Actual cost.
    pub ac: f64,
    pub cpi: Option<f64>,
    pub spi: Option<f64>,
    /// Estimate at completion.
    pub eac: f64,
    /// Estimate to complete.
    pub etc: f64,
    /// Variance at completion.
    pub vac: f64,
    /// Cost variance (EV - AC).
    pub cv: f64,
    /// Schedule variance (EV - PV).
    pub sv: f64,
}

/// A persisted earned value reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedValueSnapshot {
    pub id: EvSnapshotId,
    pub project_id: ProjectId,
    pub as_of: NaiveDate,
    pub captured_at: DateTime<Utc>,
    pub data: EarnedValueData,
}
