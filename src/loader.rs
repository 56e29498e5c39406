//! Schedule snapshot loader.
//!
//! Resolves a scope to its projects and reads everything the analyses need
//! from the stores into one [`ScheduleSnapshot`].

use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{ScenarioError, ScenarioWarning, Warnings};
use crate::models::{PortfolioId, ProjectId, ScheduleSnapshot, Scope, ScopeType, TaskId};
use crate::store::{AllocationStore, CapacityProvider, ProjectStore};

/// Reads snapshots from the live data stores.
pub struct SnapshotLoader<'a> {
    projects: &'a dyn ProjectStore,
    allocations: &'a dyn AllocationStore,
    capacity: &'a dyn CapacityProvider,
    config: &'a EngineConfig,
}

impl<'a> SnapshotLoader<'a> {
    pub fn new(
        projects: &'a dyn ProjectStore,
        allocations: &'a dyn AllocationStore,
        capacity: &'a dyn CapacityProvider,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            projects,
            allocations,
            capacity,
            config,
        }
    }

    /// Resolves a scope reference to its projects.
    ///
    /// # Errors
    /// `NotFound` if the project or portfolio does not exist.
    pub fn resolve_scope(
        &self,
        scope_type: ScopeType,
        scope_id: &str,
    ) -> Result<Scope, ScenarioError> {
        match scope_type {
            ScopeType::Project => {
                let project_id = ProjectId::from(scope_id);
                if !self.projects.project_exists(&project_id)? {
                    return Err(ScenarioError::not_found("Project", scope_id));
                }
                Ok(Scope::project(project_id))
            }
            ScopeType::Portfolio => {
                let members = self
                    .projects
                    .portfolio_projects(&PortfolioId::from(scope_id))?
                    .ok_or_else(|| ScenarioError::not_found("Portfolio", scope_id))?;
                Ok(Scope::portfolio(scope_id, members))
            }
        }
    }

    /// Loads the snapshot of `scope` as of `as_of`.
    ///
    /// An empty scope yields an empty snapshot and an `EmptyScope` warning.
    pub fn load(
        &self,
        scope: &Scope,
        as_of: NaiveDate,
        warnings: &mut Warnings,
    ) -> Result<ScheduleSnapshot, ScenarioError> {
        let project_ids = &scope.project_ids;
        let horizon_end = as_of + Duration::days(self.config.open_allocation_horizon_days);
        let mut snapshot = ScheduleSnapshot::new(scope.clone(), as_of, horizon_end);

        let mut tasks = self.projects.tasks_for_projects(project_ids)?;
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot.tasks = tasks.into_iter().map(Arc::new).collect();

        let task_ids: BTreeSet<&TaskId> = snapshot.tasks.iter().map(|t| &t.id).collect();
        let all_dependencies = self.projects.dependencies_for_projects(project_ids)?;
        let loaded = all_dependencies.len();
        let mut dependencies: Vec<_> = all_dependencies
            .into_iter()
            .filter(|d| task_ids.contains(&d.predecessor_id) && task_ids.contains(&d.successor_id))
            .collect();
        if dependencies.len() < loaded {
            debug!(
                scope = %scope.scope_id,
                dropped = loaded - dependencies.len(),
                "Dropped dependencies crossing the scope boundary"
            );
        }
        dependencies.sort_by(|a, b| {
            (&a.predecessor_id, &a.successor_id).cmp(&(&b.predecessor_id, &b.successor_id))
        });
        snapshot.dependencies = Arc::new(dependencies);

        let mut allocations = self.allocations.allocations_for_projects(project_ids)?;
        allocations.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot.allocations = allocations.into_iter().map(Arc::new).collect();

        for user_id in snapshot.allocated_user_ids() {
            if let Some(calendar) = self.capacity.capacity_for_user(&user_id)? {
                snapshot.capacities.insert(user_id, Arc::new(calendar));
            }
        }

        for project_id in project_ids {
            if let Some(financials) = self.projects.project_financials(project_id)? {
                snapshot.financials.insert(project_id.clone(), financials);
            }
        }

        if snapshot.is_empty() {
            warnings.push(ScenarioWarning::EmptyScope {
                scope_id: scope.scope_id.clone(),
            });
        }

        debug!(
            scope = %scope.scope_id,
            projects = project_ids.len(),
            tasks = snapshot.tasks.len(),
            dependencies = snapshot.dependencies.len(),
            allocations = snapshot.allocations.len(),
            "Loaded schedule snapshot"
        );
        Ok(snapshot)
    }
}
