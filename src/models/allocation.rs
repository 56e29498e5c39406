//! Resource allocation and project financial models.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{AllocationId, DateRange, ProjectId, UserId};

/// A share of a user's working time booked on a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAllocation {
    pub id: AllocationId,
    pub user_id: UserId,
    pub project_id: ProjectId,
    /// Percent of the user's nominal day (100 = full time).
    pub allocation_percent: f64,
    pub start_date: NaiveDate,
    /// Last allocated day. `None` = open-ended.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl ResourceAllocation {
    pub fn new(
        id: impl Into<AllocationId>,
        user_id: impl Into<UserId>,
        project_id: impl Into<ProjectId>,
        allocation_percent: f64,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            project_id: project_id.into(),
            allocation_percent,
            start_date,
            end_date,
        }
    }

    /// Days covered, with open-ended allocations running to `horizon_end`.
    pub fn effective_range(&self, horizon_end: NaiveDate) -> DateRange {
        DateRange::new(self.start_date, self.end_date.unwrap_or(horizon_end))
    }

    /// Moves the allocation by `days`. Returns `false` and leaves it
    /// unchanged when a date would fall outside the representable range.
    pub fn shift_days(&mut self, days: i64) -> bool {
        let Some(delta) = Duration::try_days(days) else {
            return false;
        };
        let Some(start_date) = self.start_date.checked_add_signed(delta) else {
            return false;
        };
        let end_date = match self.end_date {
            Some(end) => match end.checked_add_signed(delta) {
                Some(shifted) => Some(shifted),
                None => return false,
            },
            None => None,
        };
        self.start_date = start_date;
        self.end_date = end_date;
        true
    }
}

/// Cost inputs for earned value, read from the project store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFinancials {
    pub project_id: ProjectId,
    /// Budget at completion (BAC).
    pub budget_at_completion: f64,
    /// Actual cost to date. `None` = no actuals recorded at all.
    #[serde(default)]
    pub actual_cost: Option<f64>,
    /// Project-level completion (0..=100), used when no tasks exist.
    #[serde(default)]
    pub percent_complete: Option<f64>,
}

impl ProjectFinancials {
    pub fn new(project_id: impl Into<ProjectId>, budget_at_completion: f64) -> Self {
        Self {
            project_id: project_id.into(),
            budget_at_completion,
            actual_cost: None,
            percent_complete: None,
        }
    }

    pub fn with_actual_cost(mut self, actual_cost: f64) -> Self {
        self.actual_cost = Some(actual_cost);
        self
    }

    pub fn with_percent_complete(mut self, percent: f64) -> Self {
        self.percent_complete = Some(percent.clamp(0.0, 100.0));
        self
    }
}
