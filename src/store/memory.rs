//! In-memory store.
//!
//! Holds every record behind one mutex, so each trait call is a single
//! transaction. Baseline activation, action edits with their revision bump
//! and result overwrite never interleave with other writers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use super::{AllocationStore, BaselineStore, CapacityProvider, ProjectStore, ScenarioStore};
use crate::error::StoreError;
use crate::models::{
    ActionId, Baseline, BaselineId, CapacityCalendar, Dependency, EarnedValueSnapshot,
    PortfolioId, ProjectFinancials, ProjectId, ResourceAllocation, ScenarioAction, ScenarioId,
    ScenarioPlan, ScenarioResult, ScenarioStatus, ScheduledTask, TaskId, TeamId, TeamRoster,
    UserId,
};

/// A portfolio and its member projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioRecord {
    pub id: PortfolioId,
    pub project_ids: Vec<ProjectId>,
}

/// Serializable contents of an [`InMemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Dataset {
    /// Projects without tasks or financials still need to be listed here.
    pub projects: Vec<ProjectId>,
    pub portfolios: Vec<PortfolioRecord>,
    pub tasks: Vec<ScheduledTask>,
    pub dependencies: Vec<Dependency>,
    pub financials: Vec<ProjectFinancials>,
    pub allocations: Vec<ResourceAllocation>,
    pub calendars: Vec<CapacityCalendar>,
    pub teams: Vec<TeamRoster>,
    pub scenarios: Vec<ScenarioPlan>,
    pub actions: Vec<ScenarioAction>,
    pub results: Vec<ScenarioResult>,
    pub baselines: Vec<Baseline>,
    pub ev_snapshots: Vec<EarnedValueSnapshot>,
}

#[derive(Debug, Default)]
struct State {
    projects: BTreeSet<ProjectId>,
    portfolios: BTreeMap<PortfolioId, Vec<ProjectId>>,
    tasks: Vec<ScheduledTask>,
    dependencies: Vec<Dependency>,
    financials: BTreeMap<ProjectId, ProjectFinancials>,
    allocations: Vec<ResourceAllocation>,
    calendars: BTreeMap<UserId, CapacityCalendar>,
    teams: BTreeMap<TeamId, Vec<UserId>>,
    scenarios: BTreeMap<ScenarioId, ScenarioPlan>,
    actions: BTreeMap<ScenarioId, Vec<ScenarioAction>>,
    results: BTreeMap<ScenarioId, ScenarioResult>,
    baselines: BTreeMap<BaselineId, Baseline>,
    ev_snapshots: Vec<EarnedValueSnapshot>,
}

/// Mutex-guarded store implementing every store trait.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        let mut projects: BTreeSet<ProjectId> = dataset.projects.into_iter().collect();
        projects.extend(dataset.tasks.iter().map(|t| t.project_id.clone()));
        projects.extend(dataset.financials.iter().map(|f| f.project_id.clone()));
        projects.extend(dataset.allocations.iter().map(|a| a.project_id.clone()));

        let mut actions: BTreeMap<ScenarioId, Vec<ScenarioAction>> = BTreeMap::new();
        for action in dataset.actions {
            actions
                .entry(action.scenario_id.clone())
                .or_default()
                .push(action);
        }
        for list in actions.values_mut() {
            list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        }

        let state = State {
            projects,
            portfolios: dataset
                .portfolios
                .into_iter()
                .map(|p| (p.id, p.project_ids))
                .collect(),
            tasks: dataset.tasks,
            dependencies: dataset.dependencies,
            financials: dataset
                .financials
                .into_iter()
                .map(|f| (f.project_id.clone(), f))
                .collect(),
            allocations: dataset.allocations,
            calendars: dataset
                .calendars
                .into_iter()
                .map(|c| (c.user_id.clone(), c))
                .collect(),
            teams: dataset
                .teams
                .into_iter()
                .map(|t| (t.team_id, t.members))
                .collect(),
            scenarios: dataset
                .scenarios
                .into_iter()
                .map(|s| (s.id.clone(), s))
                .collect(),
            actions,
            results: dataset
                .results
                .into_iter()
                .map(|r| (r.scenario_id.clone(), r))
                .collect(),
            baselines: dataset
                .baselines
                .into_iter()
                .map(|b| (b.id.clone(), b))
                .collect(),
            ev_snapshots: dataset.ev_snapshots,
        };

        Self {
            state: Mutex::new(state),
        }
    }

    /// Parses a JSON dataset.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_dataset(serde_json::from_str(json)?))
    }

    fn state(&self, operation: &'static str) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::backend(operation, e))
    }
}

impl ProjectStore for InMemoryStore {
    fn project_exists(&self, project_id: &ProjectId) -> Result<bool, StoreError> {
        Ok(self.state("project_exists")?.projects.contains(project_id))
    }

    fn portfolio_projects(
        &self,
        portfolio_id: &PortfolioId,
    ) -> Result<Option<Vec<ProjectId>>, StoreError> {
        Ok(self
            .state("portfolio_projects")?
            .portfolios
            .get(portfolio_id)
            .cloned())
    }

    fn tasks_for_projects(
        &self,
        project_ids: &[ProjectId],
    ) -> Result<Vec<ScheduledTask>, StoreError> {
        let state = self.state("tasks_for_projects")?;
        Ok(state
            .tasks
            .iter()
            .filter(|t| project_ids.contains(&t.project_id))
            .cloned()
            .collect())
    }

    fn dependencies_for_projects(
        &self,
        project_ids: &[ProjectId],
    ) -> Result<Vec<Dependency>, StoreError> {
        let state = self.state("dependencies_for_projects")?;
        let in_scope: BTreeSet<&TaskId> = state
            .tasks
            .iter()
            .filter(|t| project_ids.contains(&t.project_id))
            .map(|t| &t.id)
            .collect();
        Ok(state
            .dependencies
            .iter()
            .filter(|d| in_scope.contains(&d.predecessor_id) || in_scope.contains(&d.successor_id))
            .cloned()
            .collect())
    }

    fn project_financials(
        &self,
        project_id: &ProjectId,
    ) -> Result<Option<ProjectFinancials>, StoreError> {
        Ok(self
            .state("project_financials")?
            .financials
            .get(project_id)
            .cloned())
    }
}

impl AllocationStore for InMemoryStore {
    fn allocations_for_projects(
        &self,
        project_ids: &[ProjectId],
    ) -> Result<Vec<ResourceAllocation>, StoreError> {
        let state = self.state("allocations_for_projects")?;
        Ok(state
            .allocations
            .iter()
            .filter(|a| project_ids.contains(&a.project_id))
            .cloned()
            .collect())
    }
}

impl CapacityProvider for InMemoryStore {
    fn capacity_for_user(&self, user_id: &UserId) -> Result<Option<CapacityCalendar>, StoreError> {
        Ok(self
            .state("capacity_for_user")?
            .calendars
            .get(user_id)
            .cloned())
    }

    fn team_members(&self, team_id: &TeamId) -> Result<Option<Vec<UserId>>, StoreError> {
        Ok(self.state("team_members")?.teams.get(team_id).cloned())
    }
}

impl ScenarioStore for InMemoryStore {
    fn list_scenarios(&self) -> Result<Vec<ScenarioPlan>, StoreError> {
        Ok(self
            .state("list_scenarios")?
            .scenarios
            .values()
            .cloned()
            .collect())
    }

    fn get_scenario(&self, id: &ScenarioId) -> Result<Option<ScenarioPlan>, StoreError> {
        Ok(self.state("get_scenario")?.scenarios.get(id).cloned())
    }

    fn save_scenario(&self, plan: &ScenarioPlan) -> Result<(), StoreError> {
        self.state("save_scenario")?
            .scenarios
            .insert(plan.id.clone(), plan.clone());
        Ok(())
    }

    fn update_status(
        &self,
        id: &ScenarioId,
        status: ScenarioStatus,
        at: DateTime<Utc>,
    ) -> Result<ScenarioPlan, StoreError> {
        let mut state = self.state("update_status")?;
        let plan = state
            .scenarios
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("Scenario", id))?;
        plan.status = status;
        plan.updated_at = at;
        Ok(plan.clone())
    }

    fn delete_scenario(&self, id: &ScenarioId) -> Result<(), StoreError> {
        let mut state = self.state("delete_scenario")?;
        if state.scenarios.remove(id).is_none() {
            return Err(StoreError::not_found("Scenario", id));
        }
        state.actions.remove(id);
        state.results.remove(id);
        Ok(())
    }

    fn list_actions(&self, scenario_id: &ScenarioId) -> Result<Vec<ScenarioAction>, StoreError> {
        Ok(self
            .state("list_actions")?
            .actions
            .get(scenario_id)
            .cloned()
            .unwrap_or_default())
    }

    fn append_action(&self, action: &ScenarioAction) -> Result<ScenarioPlan, StoreError> {
        let mut state = self.state("append_action")?;
        let State {
            scenarios, actions, ..
        } = &mut *state;
        let plan = scenarios
            .get_mut(&action.scenario_id)
            .ok_or_else(|| StoreError::not_found("Scenario", &action.scenario_id))?;
        let list = actions.entry(action.scenario_id.clone()).or_default();
        if list.iter().any(|a| a.id == action.id) {
            return Err(StoreError::Conflict(format!(
                "action {} already exists",
                action.id
            )));
        }
        list.push(action.clone());
        plan.touch_actions(action.created_at);
        Ok(plan.clone())
    }

    fn remove_action(
        &self,
        scenario_id: &ScenarioId,
        action_id: &ActionId,
        at: DateTime<Utc>,
    ) -> Result<ScenarioPlan, StoreError> {
        let mut state = self.state("remove_action")?;
        let State {
            scenarios, actions, ..
        } = &mut *state;
        let plan = scenarios
            .get_mut(scenario_id)
            .ok_or_else(|| StoreError::not_found("Scenario", scenario_id))?;
        let list = actions
            .get_mut(scenario_id)
            .ok_or_else(|| StoreError::not_found("ScenarioAction", action_id))?;
        let pos = list
            .iter()
            .position(|a| &a.id == action_id)
            .ok_or_else(|| StoreError::not_found("ScenarioAction", action_id))?;
        list.remove(pos);
        plan.touch_actions(at);
        Ok(plan.clone())
    }

    fn get_result(&self, scenario_id: &ScenarioId) -> Result<Option<ScenarioResult>, StoreError> {
        Ok(self.state("get_result")?.results.get(scenario_id).cloned())
    }

    fn save_result(&self, result: &ScenarioResult) -> Result<(), StoreError> {
        let mut state = self.state("save_result")?;
        if !state.scenarios.contains_key(&result.scenario_id) {
            return Err(StoreError::not_found("Scenario", &result.scenario_id));
        }
        state
            .results
            .insert(result.scenario_id.clone(), result.clone());
        Ok(())
    }
}

impl BaselineStore for InMemoryStore {
    fn insert_baseline(&self, baseline: &Baseline) -> Result<(), StoreError> {
        let mut state = self.state("insert_baseline")?;
        if state.baselines.contains_key(&baseline.id) {
            return Err(StoreError::Conflict(format!(
                "Baseline {} already exists",
                baseline.id
            )));
        }
        if baseline.is_active {
            for other in state.baselines.values_mut() {
                if other.project_id == baseline.project_id {
                    other.is_active = false;
                }
            }
        }
        state
            .baselines
            .insert(baseline.id.clone(), baseline.clone());
        Ok(())
    }

    fn get_baseline(&self, id: &BaselineId) -> Result<Option<Baseline>, StoreError> {
        Ok(self.state("get_baseline")?.baselines.get(id).cloned())
    }

    fn list_baselines(&self, project_id: &ProjectId) -> Result<Vec<Baseline>, StoreError> {
        let state = self.state("list_baselines")?;
        let mut baselines: Vec<Baseline> = state
            .baselines
            .values()
            .filter(|b| &b.project_id == project_id)
            .cloned()
            .collect();
        baselines.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(baselines)
    }

    fn activate_baseline(&self, id: &BaselineId) -> Result<Baseline, StoreError> {
        let mut state = self.state("activate_baseline")?;
        let project_id = state
            .baselines
            .get(id)
            .map(|b| b.project_id.clone())
            .ok_or_else(|| StoreError::not_found("Baseline", id))?;

        let mut activated = None;
        for baseline in state.baselines.values_mut() {
            if baseline.project_id == project_id {
                baseline.is_active = &baseline.id == id;
                if baseline.is_active {
                    activated = Some(baseline.clone());
                }
            }
        }
        activated.ok_or_else(|| StoreError::not_found("Baseline", id))
    }

    fn active_baseline(&self, project_id: &ProjectId) -> Result<Option<Baseline>, StoreError> {
        Ok(self
            .state("active_baseline")?
            .baselines
            .values()
            .find(|b| &b.project_id == project_id && b.is_active)
            .cloned())
    }

    fn save_ev_snapshot(&self, snapshot: &EarnedValueSnapshot) -> Result<(), StoreError> {
        self.state("save_ev_snapshot")?
            .ev_snapshots
            .push(snapshot.clone());
        Ok(())
    }

    fn list_ev_snapshots(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<EarnedValueSnapshot>, StoreError> {
        let state = self.state("list_ev_snapshots")?;
        let mut snapshots: Vec<EarnedValueSnapshot> = state
            .ev_snapshots
            .iter()
            .filter(|s| &s.project_id == project_id)
            .cloned()
            .collect();
        snapshots.sort_by(|a, b| a.as_of.cmp(&b.as_of).then(a.captured_at.cmp(&b.captured_at)));
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScopeType;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn baseline(id: &str, project: &str, active: bool, day: u32) -> Baseline {
        Baseline {
            id: id.into(),
            project_id: project.into(),
            name: id.to_string(),
            is_active: active,
            created_at: at(day),
            tasks: Vec::new(),
        }
    }

    fn plan(id: &str) -> ScenarioPlan {
        ScenarioPlan {
            id: id.into(),
            name: id.to_string(),
            description: String::new(),
            scope_type: ScopeType::Project,
            scope_id: "P1".into(),
            status: Default::default(),
            created_by: String::new(),
            created_at: at(1),
            updated_at: at(1),
            actions_revision: 0,
        }
    }

    fn action(id: &str, scenario: &str, day: u32) -> ScenarioAction {
        ScenarioAction {
            id: id.into(),
            scenario_id: scenario.into(),
            action_type: "shift_project".into(),
            payload: serde_json::json!({"projectId": "P1", "shiftDays": 1}),
            created_at: at(day),
        }
    }

    #[test]
    fn test_dataset_from_json() {
        let store = InMemoryStore::from_json(
            r#"{
                "portfolios": [{"id": "pf", "projectIds": ["P1", "P2"]}],
                "tasks": [
                    {"id": "T1", "projectId": "P1", "start": "2024-01-01T00:00:00Z", "end": "2024-01-03T00:00:00Z"},
                    {"id": "T2", "projectId": "P2", "start": "2024-01-03T00:00:00Z", "end": "2024-01-05T00:00:00Z"},
                    {"id": "T3", "projectId": "P3", "start": "2024-01-03T00:00:00Z", "end": "2024-01-05T00:00:00Z"}
                ],
                "dependencies": [
                    {"predecessorId": "T1", "successorId": "T2"},
                    {"predecessorId": "T3", "successorId": "T3", "type": "StartToStart"}
                ],
                "teams": [{"teamId": "core", "members": ["u1"]}]
            }"#,
        )
        .unwrap();

        let projects = store.portfolio_projects(&"pf".into()).unwrap().unwrap();
        assert_eq!(projects.len(), 2);
        assert!(store.project_exists(&"P3".into()).unwrap());
        assert_eq!(store.tasks_for_projects(&projects).unwrap().len(), 2);
        assert_eq!(store.dependencies_for_projects(&projects).unwrap().len(), 1);
        assert_eq!(
            store.team_members(&"core".into()).unwrap(),
            Some(vec![UserId::from("u1")])
        );
    }

    #[test]
    fn test_baseline_activation_is_exclusive() {
        let store = InMemoryStore::new();
        store.insert_baseline(&baseline("b1", "P1", true, 1)).unwrap();
        store.insert_baseline(&baseline("b2", "P1", true, 2)).unwrap();
        store.insert_baseline(&baseline("b3", "P2", true, 2)).unwrap();

        let active = store.active_baseline(&"P1".into()).unwrap().unwrap();
        assert_eq!(active.id.as_str(), "b2");

        store.activate_baseline(&"b1".into()).unwrap();
        let all = store.list_baselines(&"P1".into()).unwrap();
        assert_eq!(all.iter().filter(|b| b.is_active).count(), 1);
        assert!(all[0].is_active);
        // other projects untouched
        assert!(store.active_baseline(&"P2".into()).unwrap().is_some());
    }

    #[test]
    fn test_activate_unknown_baseline() {
        let store = InMemoryStore::new();
        let err = store.activate_baseline(&"nope".into()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_duplicate_baseline_conflicts() {
        let store = InMemoryStore::new();
        store.insert_baseline(&baseline("b1", "P1", false, 1)).unwrap();
        assert!(matches!(
            store.insert_baseline(&baseline("b1", "P1", false, 1)),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_delete_scenario_cascades() {
        let store = InMemoryStore::new();
        store.save_scenario(&plan("s1")).unwrap();
        store.append_action(&action("a1", "s1", 2)).unwrap();
        store
            .save_result(&ScenarioResult {
                id: "r1".into(),
                scenario_id: "s1".into(),
                computed_at: at(3),
                actions_revision: 1,
                summary: Default::default(),
                warnings: Vec::new(),
            })
            .unwrap();

        store.delete_scenario(&"s1".into()).unwrap();
        assert!(store.get_scenario(&"s1".into()).unwrap().is_none());
        assert!(store.list_actions(&"s1".into()).unwrap().is_empty());
        assert!(store.get_result(&"s1".into()).unwrap().is_none());
        assert!(store.delete_scenario(&"s1".into()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_action_edits_bump_revision() {
        let store = InMemoryStore::new();
        assert!(store
            .append_action(&action("a0", "s1", 2))
            .unwrap_err()
            .is_not_found());

        store.save_scenario(&plan("s1")).unwrap();
        store.append_action(&action("a1", "s1", 2)).unwrap();
        let plan = store.append_action(&action("a2", "s1", 3)).unwrap();
        assert_eq!(plan.actions_revision, 2);
        assert_eq!(plan.updated_at, at(3));
        assert!(matches!(
            store.append_action(&action("a2", "s1", 4)),
            Err(StoreError::Conflict(_))
        ));

        let plan = store
            .remove_action(&"s1".into(), &"a1".into(), at(5))
            .unwrap();
        assert_eq!(plan.actions_revision, 3);
        assert_eq!(store.get_scenario(&"s1".into()).unwrap(), Some(plan));
        assert!(store
            .remove_action(&"s1".into(), &"a1".into(), at(6))
            .unwrap_err()
            .is_not_found());
        assert!(store
            .remove_action(&"s2".into(), &"a2".into(), at(6))
            .unwrap_err()
            .is_not_found());
        assert_eq!(store.list_actions(&"s1".into()).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_appends_keep_every_revision() {
        let store = InMemoryStore::new();
        store.save_scenario(&plan("s1")).unwrap();

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for n in 0..25 {
                        let id = format!("a{worker}-{n}");
                        store.append_action(&action(&id, "s1", 2)).unwrap();
                    }
                });
            }
        });

        let plan = store.get_scenario(&"s1".into()).unwrap().unwrap();
        assert_eq!(plan.actions_revision, 200);
        assert_eq!(store.list_actions(&"s1".into()).unwrap().len(), 200);
    }

    #[test]
    fn test_update_status_keeps_revision() {
        let store = InMemoryStore::new();
        store.save_scenario(&plan("s1")).unwrap();
        store.append_action(&action("a1", "s1", 2)).unwrap();

        let plan = store
            .update_status(&"s1".into(), ScenarioStatus::Active, at(4))
            .unwrap();
        assert_eq!(plan.status, ScenarioStatus::Active);
        assert_eq!(plan.actions_revision, 1);
        assert_eq!(plan.updated_at, at(4));
        assert!(store
            .update_status(&"s2".into(), ScenarioStatus::Active, at(4))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_dataset_actions_ordered_by_time_then_id() {
        let store = InMemoryStore::from_dataset(Dataset {
            actions: vec![action("b", "s1", 3), action("c", "s1", 2), action("a", "s1", 3)],
            ..Dataset::default()
        });
        let ids: Vec<_> = store
            .list_actions(&"s1".into())
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![ActionId::from("c"), "a".into(), "b".into()]);
    }
}
