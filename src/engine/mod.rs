//! Scenario engine.
//!
//! [`ScenarioEngine`] is the public entry point: scenario CRUD, scenario
//! computation, baselines and earned value. It reads live data through the
//! store traits, writes only scenario, baseline and earned value records, and
//! takes the current time from the injected [`Clock`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use u_scenario::clock::SystemClock;
//! use u_scenario::engine::ScenarioEngine;
//! use u_scenario::models::{NewScenario, ScopeType};
//! use u_scenario::store::InMemoryStore;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let engine = ScenarioEngine::from_store(store, Arc::new(SystemClock));
//! let plan = engine
//!     .create_scenario(NewScenario::new("Delay launch", ScopeType::Project, "P1"))
//!     .unwrap();
//! let outcome = engine.compute_scenario(&plan.id).unwrap();
//! println!("{:?}", outcome.summary.deltas);
//! ```

mod compute;
mod impact;

pub use compute::{analyze_state, compute_summary, StateAnalysis};
pub use impact::impacted_projects;

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::actions::{parse_actions, parse_payload, referenced_teams};
use crate::analysis::{baseline, earned_value, CriticalPathResult, EarnedValueInput};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{ScenarioError, Warnings};
use crate::loader::SnapshotLoader;
use crate::models::{
    ActionId, Baseline, BaselineCompareResult, BaselineId, ComputeOutcome, EarnedValueData,
    EarnedValueSnapshot, EvSnapshotId, NewBaseline, NewScenario, ProjectId, ResultId,
    ScenarioAction, ScenarioDetails, ScenarioId, ScenarioPlan, ScenarioResult, ScenarioStatus,
    ScheduleSnapshot, ScopeType,
};
use crate::store::{AllocationStore, BaselineStore, CapacityProvider, ProjectStore, ScenarioStore};
use crate::validation::{into_scenario_error, validate_snapshot};

/// What-if scenario engine over a set of stores.
pub struct ScenarioEngine {
    projects: Arc<dyn ProjectStore>,
    allocations: Arc<dyn AllocationStore>,
    capacity: Arc<dyn CapacityProvider>,
    scenarios: Arc<dyn ScenarioStore>,
    baselines: Arc<dyn BaselineStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl ScenarioEngine {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        allocations: Arc<dyn AllocationStore>,
        capacity: Arc<dyn CapacityProvider>,
        scenarios: Arc<dyn ScenarioStore>,
        baselines: Arc<dyn BaselineStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            projects,
            allocations,
            capacity,
            scenarios,
            baselines,
            clock,
            config: EngineConfig::default(),
        }
    }

    /// Builds an engine whose stores are all backed by `store`.
    pub fn from_store<S>(store: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: ProjectStore
            + AllocationStore
            + CapacityProvider
            + ScenarioStore
            + BaselineStore
            + 'static,
    {
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            clock,
        )
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn loader(&self) -> SnapshotLoader<'_> {
        SnapshotLoader::new(
            self.projects.as_ref(),
            self.allocations.as_ref(),
            self.capacity.as_ref(),
            &self.config,
        )
    }

    fn require_scenario(&self, id: &ScenarioId) -> Result<ScenarioPlan, ScenarioError> {
        self.scenarios
            .get_scenario(id)?
            .ok_or_else(|| ScenarioError::not_found("Scenario", id))
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    /// Scenarios of one scope, oldest first.
    pub fn list_scenarios(
        &self,
        scope_type: ScopeType,
        scope_id: &str,
    ) -> Result<Vec<ScenarioPlan>, ScenarioError> {
        let mut plans: Vec<ScenarioPlan> = self
            .scenarios
            .list_scenarios()?
            .into_iter()
            .filter(|p| p.scope_type == scope_type && p.scope_id == scope_id)
            .collect();
        plans.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(plans)
    }

    /// Creates a draft scenario.
    ///
    /// # Errors
    /// `NotFound` if the scope does not exist.
    pub fn create_scenario(&self, input: NewScenario) -> Result<ScenarioPlan, ScenarioError> {
        let scope = self.loader().resolve_scope(input.scope_type, &input.scope_id)?;
        let now = self.clock.now();
        let plan = ScenarioPlan {
            id: ScenarioId::generate(),
            name: input.name,
            description: input.description,
            scope_type: scope.scope_type,
            scope_id: scope.scope_id,
            status: ScenarioStatus::Draft,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
            actions_revision: 0,
        };
        self.scenarios.save_scenario(&plan)?;
        info!(scenario_id = %plan.id, scope = %plan.scope_id, "Scenario created");
        Ok(plan)
    }

    /// A scenario with its ordered actions, last result and lifecycle.
    pub fn get_scenario(&self, id: &ScenarioId) -> Result<ScenarioDetails, ScenarioError> {
        let plan = self.require_scenario(id)?;
        let actions = self.ordered_actions(id)?;
        let result = self.scenarios.get_result(id)?;
        let lifecycle = plan.lifecycle(result.as_ref());
        Ok(ScenarioDetails {
            plan,
            actions,
            result,
            lifecycle,
        })
    }

    /// Appends an action after validating its payload.
    ///
    /// # Errors
    /// `InvalidActionPayload` if the payload does not fit `action_type`;
    /// nothing is stored in that case.
    pub fn add_action(
        &self,
        scenario_id: &ScenarioId,
        action_type: &str,
        payload: serde_json::Value,
    ) -> Result<ScenarioAction, ScenarioError> {
        self.require_scenario(scenario_id)?;
        let id = ActionId::generate();
        parse_payload(&id, action_type, &payload)?;

        let action = ScenarioAction {
            id,
            scenario_id: scenario_id.clone(),
            action_type: action_type.to_string(),
            payload,
            created_at: self.clock.now(),
        };
        let plan = self.scenarios.append_action(&action)?;
        debug!(
            action_id = %action.id,
            revision = plan.actions_revision,
            "Action added"
        );
        Ok(action)
    }

    pub fn remove_action(
        &self,
        scenario_id: &ScenarioId,
        action_id: &ActionId,
    ) -> Result<(), ScenarioError> {
        let plan = self
            .scenarios
            .remove_action(scenario_id, action_id, self.clock.now())?;
        debug!(%action_id, revision = plan.actions_revision, "Action removed");
        Ok(())
    }

    /// Removes a scenario with its actions and result.
    pub fn delete_scenario(&self, id: &ScenarioId) -> Result<(), ScenarioError> {
        self.scenarios.delete_scenario(id)?;
        info!(scenario_id = %id, "Scenario deleted");
        Ok(())
    }

    /// Sets the promoted flag. Does not affect whether the result is current.
    pub fn set_scenario_status(
        &self,
        id: &ScenarioId,
        status: ScenarioStatus,
    ) -> Result<ScenarioPlan, ScenarioError> {
        Ok(self.scenarios.update_status(id, status, self.clock.now())?)
    }

    /// Actions in application order: creation time, then id.
    fn ordered_actions(&self, id: &ScenarioId) -> Result<Vec<ScenarioAction>, ScenarioError> {
        let mut actions = self.scenarios.list_actions(id)?;
        actions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(actions)
    }

    /// Computes a scenario and stores its result, replacing any earlier one.
    ///
    /// # Errors
    /// `NotFound`, `InvalidActionPayload`, `CyclicDependency` and
    /// `InvalidSchedule` abort the computation without storing anything.
    #[instrument(skip_all, fields(scenario_id = %scenario_id))]
    pub fn compute_scenario(
        &self,
        scenario_id: &ScenarioId,
    ) -> Result<ComputeOutcome, ScenarioError> {
        // Revision is read before the actions; a concurrent edit leaves the
        // stored result stale, never falsely current.
        let plan = self.require_scenario(scenario_id)?;
        let loader = self.loader();
        let scope = loader.resolve_scope(plan.scope_type, &plan.scope_id)?;

        let mut warnings = Warnings::new();
        let before = loader.load(&scope, self.clock.today(), &mut warnings)?;
        let actions = parse_actions(&self.ordered_actions(scenario_id)?)?;

        let mut rosters = BTreeMap::new();
        for team_id in referenced_teams(&actions) {
            if let Some(members) = self.capacity.team_members(&team_id)? {
                rosters.insert(team_id, members);
            }
        }

        let mut active_baselines = BTreeMap::new();
        for project_id in &scope.project_ids {
            if let Some(b) = self.baselines.active_baseline(project_id)? {
                active_baselines.insert(project_id.clone(), b);
            }
        }

        let summary = compute_summary(
            &before,
            &actions,
            &rosters,
            &active_baselines,
            &self.config,
            &mut warnings,
        )?;

        let result = ScenarioResult {
            id: ResultId::generate(),
            scenario_id: scenario_id.clone(),
            computed_at: self.clock.now(),
            actions_revision: plan.actions_revision,
            summary,
            warnings: warnings.to_strings(),
        };
        self.scenarios.save_result(&result)?;

        info!(
            actions = actions.len(),
            impacted = result.summary.impacted_projects.len(),
            warnings = result.warnings.len(),
            "Scenario computed"
        );
        Ok(ComputeOutcome {
            summary: result.summary,
            warnings: result.warnings,
        })
    }

    // =========================================================================
    // Baselines
    // =========================================================================

    /// Loads a project as of `as_of` and runs the critical path on it.
    fn schedule_project(
        &self,
        project_id: &ProjectId,
        as_of: NaiveDate,
    ) -> Result<(ScheduleSnapshot, CriticalPathResult), ScenarioError> {
        let loader = self.loader();
        let scope = loader.resolve_scope(ScopeType::Project, project_id.as_str())?;
        let mut warnings = Warnings::new();
        let snapshot = loader.load(&scope, as_of, &mut warnings)?;
        validate_snapshot(&snapshot).map_err(into_scenario_error)?;
        let cpm =
            CriticalPathResult::calculate(&snapshot, self.config.critical_float_tolerance_minutes)?;
        Ok((cpm.scheduled_snapshot(&snapshot), cpm))
    }

    /// Freezes the project's current scheduled dates into a new baseline.
    pub fn create_baseline(
        &self,
        project_id: &ProjectId,
        input: NewBaseline,
    ) -> Result<Baseline, ScenarioError> {
        let (scheduled, cpm) = self.schedule_project(project_id, self.clock.today())?;
        let baseline = Baseline {
            id: BaselineId::generate(),
            project_id: project_id.clone(),
            name: input.name,
            is_active: input.set_active,
            created_at: self.clock.now(),
            tasks: baseline::freeze_tasks(&scheduled, &cpm, project_id),
        };
        self.baselines.insert_baseline(&baseline)?;
        info!(
            baseline_id = %baseline.id,
            project_id = %project_id,
            tasks = baseline.tasks.len(),
            active = baseline.is_active,
            "Baseline created"
        );
        Ok(baseline)
    }

    /// Makes a baseline the only active one of its project.
    pub fn activate_baseline(&self, id: &BaselineId) -> Result<Baseline, ScenarioError> {
        let baseline = self.baselines.activate_baseline(id)?;
        info!(baseline_id = %id, project_id = %baseline.project_id, "Baseline activated");
        Ok(baseline)
    }

    pub fn list_baselines(&self, project_id: &ProjectId) -> Result<Vec<Baseline>, ScenarioError> {
        Ok(self.baselines.list_baselines(project_id)?)
    }

    /// Compares a baseline with the project's current schedule.
    pub fn compare_baseline(
        &self,
        baseline_id: &BaselineId,
    ) -> Result<BaselineCompareResult, ScenarioError> {
        let frozen = self
            .baselines
            .get_baseline(baseline_id)?
            .ok_or_else(|| ScenarioError::not_found("Baseline", baseline_id))?;
        let (scheduled, _) = self.schedule_project(&frozen.project_id, self.clock.today())?;
        Ok(baseline::compare(&frozen, &scheduled))
    }

    // =========================================================================
    // Earned value
    // =========================================================================

    /// Earned value of a project as of `as_of` (today when `None`).
    ///
    /// Planned value follows the active baseline when there is one.
    ///
    /// # Errors
    /// `NotFound` if the project or its financials do not exist.
    pub fn get_earned_value(
        &self,
        project_id: &ProjectId,
        as_of: Option<NaiveDate>,
    ) -> Result<EarnedValueData, ScenarioError> {
        let as_of = as_of.unwrap_or_else(|| self.clock.today());
        let (scheduled, _) = self.schedule_project(project_id, as_of)?;
        let active = self.baselines.active_baseline(project_id)?;
        let input = EarnedValueInput::from_snapshot(&scheduled, project_id, active.as_ref())
            .ok_or_else(|| ScenarioError::not_found("ProjectFinancials", project_id))?;
        Ok(earned_value::calculate(&input))
    }

    /// Computes and stores an earned value reading.
    pub fn create_ev_snapshot(
        &self,
        project_id: &ProjectId,
        as_of: Option<NaiveDate>,
    ) -> Result<EarnedValueSnapshot, ScenarioError> {
        let data = self.get_earned_value(project_id, as_of)?;
        let snapshot = EarnedValueSnapshot {
            id: EvSnapshotId::generate(),
            project_id: project_id.clone(),
            as_of: data.as_of,
            captured_at: self.clock.now(),
            data,
        };
        self.baselines.save_ev_snapshot(&snapshot)?;
        info!(project_id = %project_id, as_of = %snapshot.as_of, "Earned value snapshot stored");
        Ok(snapshot)
    }

    pub fn list_ev_snapshots(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<EarnedValueSnapshot>, ScenarioError> {
        Ok(self.baselines.list_ev_snapshots(project_id)?)
    }
}
