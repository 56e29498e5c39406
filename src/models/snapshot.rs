//! Schedule snapshot model.
//!
//! A snapshot is the complete, immutable input of one analysis run: the
//! tasks, dependencies and allocations of a scope plus the capacity and cost
//! data needed to evaluate them. Snapshots are built per request and thrown
//! away afterwards.
//!
//! Tasks and allocations sit behind `Arc`, so deriving an "after" snapshot
//! clones pointers and only copies the records an action actually touches.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::{
    CapacityAdjustment, CapacityCalendar, Dependency, ProjectFinancials, ProjectId,
    ResourceAllocation, ScheduledTask, TaskId, UserId,
};

/// Kind of scope a scenario or snapshot covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    Project,
    Portfolio,
}

/// A resolved scope: the requested entity plus the projects it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub scope_type: ScopeType,
    pub scope_id: String,
    pub project_ids: Vec<ProjectId>,
}

impl Scope {
    pub fn project(project_id: impl Into<ProjectId>) -> Self {
        let project_id = project_id.into();
        Self {
            scope_type: ScopeType::Project,
            scope_id: project_id.to_string(),
            project_ids: vec![project_id],
        }
    }

    pub fn portfolio(portfolio_id: impl Into<String>, mut project_ids: Vec<ProjectId>) -> Self {
        project_ids.sort();
        project_ids.dedup();
        Self {
            scope_type: ScopeType::Portfolio,
            scope_id: portfolio_id.into(),
            project_ids,
        }
    }
}

/// Immutable schedule and resource state of a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSnapshot {
    pub scope: Scope,
    /// Reference date for earned value and open-ended allocations.
    pub as_of: NaiveDate,
    /// Last day open-ended allocations are assumed to run.
    pub horizon_end: NaiveDate,
    /// Tasks sorted by id.
    pub tasks: Vec<Arc<ScheduledTask>>,
    pub dependencies: Arc<Vec<Dependency>>,
    /// Allocations sorted by id.
    pub allocations: Vec<Arc<ResourceAllocation>>,
    pub capacities: BTreeMap<UserId, Arc<CapacityCalendar>>,
    /// Hypothetical capacity changes (empty for live data).
    #[serde(default)]
    pub capacity_adjustments: Vec<CapacityAdjustment>,
    pub financials: BTreeMap<ProjectId, ProjectFinancials>,
}

impl ScheduleSnapshot {
    /// Creates an empty snapshot.
    pub fn new(scope: Scope, as_of: NaiveDate, horizon_end: NaiveDate) -> Self {
        Self {
            scope,
            as_of,
            horizon_end,
            tasks: Vec::new(),
            dependencies: Arc::new(Vec::new()),
            allocations: Vec::new(),
            capacities: BTreeMap::new(),
            capacity_adjustments: Vec::new(),
            financials: BTreeMap::new(),
        }
    }

    /// Adds a task, keeping tasks sorted by id.
    pub fn with_task(mut self, task: ScheduledTask) -> Self {
        self.tasks.push(Arc::new(task));
        self.tasks.sort_by(|a, b| a.id.cmp(&b.id));
        self
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        Arc::make_mut(&mut self.dependencies).push(dependency);
        self
    }

    /// Adds an allocation, keeping allocations sorted by id.
    pub fn with_allocation(mut self, allocation: ResourceAllocation) -> Self {
        self.allocations.push(Arc::new(allocation));
        self.allocations.sort_by(|a, b| a.id.cmp(&b.id));
        self
    }

    pub fn with_capacity(mut self, calendar: CapacityCalendar) -> Self {
        self.capacities
            .insert(calendar.user_id.clone(), Arc::new(calendar));
        self
    }

    pub fn with_financials(mut self, financials: ProjectFinancials) -> Self {
        self.financials
            .insert(financials.project_id.clone(), financials);
        self
    }

    /// Whether there is nothing to compute.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.allocations.is_empty()
    }

    /// Position of a task in `tasks`.
    pub fn task_position(&self, task_id: &TaskId) -> Option<usize> {
        self.tasks.binary_search_by(|t| t.id.cmp(task_id)).ok()
    }

    pub fn task(&self, task_id: &TaskId) -> Option<&ScheduledTask> {
        self.task_position(task_id).map(|i| self.tasks[i].as_ref())
    }

    pub fn tasks_for_project<'a>(
        &'a self,
        project_id: &'a ProjectId,
    ) -> impl Iterator<Item = &'a ScheduledTask> + 'a {
        self.tasks
            .iter()
            .map(|t| t.as_ref())
            .filter(move |t| &t.project_id == project_id)
    }

    pub fn allocations_for_user<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> impl Iterator<Item = &'a ResourceAllocation> + 'a {
        self.allocations
            .iter()
            .map(|a| a.as_ref())
            .filter(move |a| &a.user_id == user_id)
    }

    /// Projects that own at least one task or allocation.
    pub fn active_project_ids(&self) -> BTreeSet<ProjectId> {
        self.tasks
            .iter()
            .map(|t| t.project_id.clone())
            .chain(self.allocations.iter().map(|a| a.project_id.clone()))
            .collect()
    }

    /// Users with at least one allocation.
    pub fn allocated_user_ids(&self) -> BTreeSet<UserId> {
        self.allocations.iter().map(|a| a.user_id.clone()).collect()
    }

    /// Earliest planned start across all tasks.
    pub fn planned_start(&self) -> Option<DateTime<Utc>> {
        self.tasks.iter().map(|t| t.start).min()
    }

    /// Latest planned end across all tasks.
    pub fn planned_finish(&self) -> Option<DateTime<Utc>> {
        self.tasks.iter().map(|t| t.end).max()
    }

    /// Latest planned end of a project's tasks.
    pub fn planned_finish_for(&self, project_id: &ProjectId) -> Option<DateTime<Utc>> {
        self.tasks_for_project(project_id).map(|t| t.end).max()
    }
}
