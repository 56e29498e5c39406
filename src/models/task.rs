//! Task and dependency models.
//!
//! A task is a dated unit of project work. Dependencies link tasks into a
//! directed graph that must stay acyclic.
//!
//! # Time Representation
//! Task dates are UTC instants. Analyses work in whole minutes; lags are
//! expressed in calendar days (1 day = 1440 minutes).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{ProjectId, TaskId};

/// Minutes in one calendar day.
pub const MINUTES_PER_DAY: i64 = 1440;

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Blocked,
    Done,
    Cancelled,
}

/// A scheduled task as read from the project store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    /// Unique task identifier.
    pub id: TaskId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    /// Planned start.
    pub start: DateTime<Utc>,
    /// Planned end. Never before `start` in valid input.
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub status: TaskStatus,
    /// Completion (0..=100).
    #[serde(default)]
    pub percent_complete: f64,
    /// Budgeted cost of this task, when the project tracks costs per task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_cost: Option<f64>,
}

impl ScheduledTask {
    /// Creates a task spanning `[start, end]`.
    pub fn new(
        id: impl Into<TaskId>,
        project_id: impl Into<ProjectId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            title: String::new(),
            start,
            end,
            status: TaskStatus::NotStarted,
            percent_complete: 0.0,
            planned_cost: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets completion, clamped to 0..=100.
    pub fn with_percent_complete(mut self, percent: f64) -> Self {
        self.percent_complete = percent.clamp(0.0, 100.0);
        self
    }

    pub fn with_planned_cost(mut self, cost: f64) -> Self {
        self.planned_cost = Some(cost);
        self
    }

    /// Duration in whole minutes (never negative).
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes().max(0)
    }

    /// Moves both dates by `days`, keeping the duration.
    ///
    /// Returns `false` and leaves the task unchanged when a date would fall
    /// outside the representable range.
    pub fn shift_days(&mut self, days: i64) -> bool {
        let Some(delta) = Duration::try_days(days) else {
            return false;
        };
        match (
            self.start.checked_add_signed(delta),
            self.end.checked_add_signed(delta),
        ) {
            (Some(start), Some(end)) => {
                self.start = start;
                self.end = end;
                true
            }
            _ => false,
        }
    }

    /// Moves the task so it starts at `start`, keeping the duration.
    ///
    /// Returns `false` and leaves the task unchanged when the new end is not
    /// representable.
    pub fn move_start_to(&mut self, start: DateTime<Utc>) -> bool {
        let duration = self.end - self.start;
        let Some(end) = start.checked_add_signed(duration) else {
            return false;
        };
        self.start = start;
        self.end = end;
        true
    }
}

/// Dependency link type.
///
/// Names the pair of predecessor/successor events the link constrains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyType {
    /// Successor starts after predecessor finishes.
    #[default]
    FinishToStart,
    /// Successor starts after predecessor starts.
    StartToStart,
    /// Successor finishes after predecessor finishes.
    FinishToFinish,
    /// Successor finishes after predecessor starts.
    StartToFinish,
}

/// A typed precedence link between two tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub predecessor_id: TaskId,
    pub successor_id: TaskId,
    #[serde(rename = "type", default)]
    pub dependency_type: DependencyType,
    /// Lag in calendar days. Negative values are leads.
    #[serde(default)]
    pub lag_days: i64,
}

impl Dependency {
    /// Creates a zero-lag finish-to-start link.
    pub fn finish_to_start(predecessor: impl Into<TaskId>, successor: impl Into<TaskId>) -> Self {
        Self::new(predecessor, successor, DependencyType::FinishToStart)
    }

    pub fn new(
        predecessor: impl Into<TaskId>,
        successor: impl Into<TaskId>,
        dependency_type: DependencyType,
    ) -> Self {
        Self {
            predecessor_id: predecessor.into(),
            successor_id: successor.into(),
            dependency_type,
            lag_days: 0,
        }
    }

    pub fn with_lag_days(mut self, lag_days: i64) -> Self {
        self.lag_days = lag_days;
        self
    }

    #[inline]
    pub fn lag_minutes(&self) -> i64 {
        self.lag_days * MINUTES_PER_DAY
    }
}
