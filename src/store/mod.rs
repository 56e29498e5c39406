//! Store traits for the engine's collaborators.
//!
//! Live project data is read through [`ProjectStore`], [`AllocationStore`]
//! and [`CapacityProvider`]; the engine never writes to them. Scenario,
//! baseline and earned value records go through [`ScenarioStore`] and
//! [`BaselineStore`].
//!
//! [`InMemoryStore`] implements every trait.

mod memory;

pub use memory::{Dataset, InMemoryStore, PortfolioRecord};

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{
    ActionId, Baseline, BaselineId, CapacityCalendar, Dependency, EarnedValueSnapshot,
    PortfolioId, ProjectFinancials, ProjectId, ResourceAllocation, ScenarioAction, ScenarioId,
    ScenarioPlan, ScenarioResult, ScenarioStatus, ScheduledTask, TeamId, UserId,
};

// =============================================================================
// Live project data (read-only)
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait ProjectStore: Send + Sync {
    fn project_exists(&self, project_id: &ProjectId) -> Result<bool, StoreError>;
    /// Member projects of a portfolio, `None` if the portfolio is unknown.
    fn portfolio_projects(
        &self,
        portfolio_id: &PortfolioId,
    ) -> Result<Option<Vec<ProjectId>>, StoreError>;
    fn tasks_for_projects(&self, project_ids: &[ProjectId])
        -> Result<Vec<ScheduledTask>, StoreError>;
    /// Dependencies touching at least one task of the given projects.
    fn dependencies_for_projects(
        &self,
        project_ids: &[ProjectId],
    ) -> Result<Vec<Dependency>, StoreError>;
    fn project_financials(
        &self,
        project_id: &ProjectId,
    ) -> Result<Option<ProjectFinancials>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait AllocationStore: Send + Sync {
    fn allocations_for_projects(
        &self,
        project_ids: &[ProjectId],
    ) -> Result<Vec<ResourceAllocation>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait CapacityProvider: Send + Sync {
    fn capacity_for_user(&self, user_id: &UserId) -> Result<Option<CapacityCalendar>, StoreError>;
    /// Members of a team, `None` if the team is unknown.
    fn team_members(&self, team_id: &TeamId) -> Result<Option<Vec<UserId>>, StoreError>;
}

// =============================================================================
// Scenario records
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait ScenarioStore: Send + Sync {
    fn list_scenarios(&self) -> Result<Vec<ScenarioPlan>, StoreError>;
    fn get_scenario(&self, id: &ScenarioId) -> Result<Option<ScenarioPlan>, StoreError>;
    fn save_scenario(&self, plan: &ScenarioPlan) -> Result<(), StoreError>;
    /// Removes the scenario together with its actions and result.
    fn delete_scenario(&self, id: &ScenarioId) -> Result<(), StoreError>;

    /// Sets the promoted status in one transaction and returns the plan.
    fn update_status(
        &self,
        id: &ScenarioId,
        status: ScenarioStatus,
        at: DateTime<Utc>,
    ) -> Result<ScenarioPlan, StoreError>;

    /// Actions of the scenario. Callers that apply them must order them by
    /// `created_at`, then by id.
    fn list_actions(&self, scenario_id: &ScenarioId) -> Result<Vec<ScenarioAction>, StoreError>;
    /// Stores the action and bumps the scenario's action revision in one
    /// transaction. Returns the updated plan.
    fn append_action(&self, action: &ScenarioAction) -> Result<ScenarioPlan, StoreError>;
    /// Deletes the action and bumps the scenario's action revision in one
    /// transaction. `NotFound` if the scenario or the action is missing.
    fn remove_action(
        &self,
        scenario_id: &ScenarioId,
        action_id: &ActionId,
        at: DateTime<Utc>,
    ) -> Result<ScenarioPlan, StoreError>;

    fn get_result(&self, scenario_id: &ScenarioId) -> Result<Option<ScenarioResult>, StoreError>;
    /// Replaces any previous result of the scenario.
    fn save_result(&self, result: &ScenarioResult) -> Result<(), StoreError>;
}

// =============================================================================
// Baselines and earned value
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait BaselineStore: Send + Sync {
    /// Stores a new baseline. If it is active, every other baseline of the
    /// project is deactivated in the same transaction.
    fn insert_baseline(&self, baseline: &Baseline) -> Result<(), StoreError>;
    fn get_baseline(&self, id: &BaselineId) -> Result<Option<Baseline>, StoreError>;
    fn list_baselines(&self, project_id: &ProjectId) -> Result<Vec<Baseline>, StoreError>;
    /// Makes `id` the only active baseline of its project, atomically.
    fn activate_baseline(&self, id: &BaselineId) -> Result<Baseline, StoreError>;
    fn active_baseline(&self, project_id: &ProjectId) -> Result<Option<Baseline>, StoreError>;

    fn save_ev_snapshot(&self, snapshot: &EarnedValueSnapshot) -> Result<(), StoreError>;
    fn list_ev_snapshots(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<EarnedValueSnapshot>, StoreError>;
}
