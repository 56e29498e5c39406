//! Scenario computation pipeline.
//!
//! # Pipeline
//!
//! 1. Validate the "before" snapshot.
//! 2. Apply the parsed actions to get "after", then validate it.
//! 3. For each side: critical path, capacity, earned value and slip.
//! 4. Deltas and impacted projects.
//!
//! Any fatal error aborts the whole computation.

use std::collections::BTreeMap;

use crate::actions::{apply_actions, ParsedAction};
use crate::analysis::{
    aggregate_indices, baseline, earned_value, evaluation_window, CapacityEvaluation,
    CriticalPathResult, EarnedValueInput,
};
use crate::config::EngineConfig;
use crate::error::{ScenarioError, ScenarioWarning, Warnings};
use crate::models::{
    Baseline, DateRange, ProjectId, ScenarioDeltas, ScenarioStateSnapshot, ScenarioSummary,
    ScheduleSnapshot, TeamId, UserId,
};
use crate::validation::{into_scenario_error, validate_snapshot};

use super::impact::impacted_projects;

/// Analysis results for one side of a scenario.
#[derive(Debug, Clone)]
pub struct StateAnalysis {
    pub state: ScenarioStateSnapshot,
    pub cpm: CriticalPathResult,
    /// Input snapshot with tasks moved to their early dates.
    pub scheduled: ScheduleSnapshot,
}

/// Runs every analysis on one snapshot.
///
/// `reference` is the unmodified "before" snapshot; its planned finish is
/// the slip reference for projects without an active baseline.
/// `capacity_window` is the range capacity is evaluated over; pass the same
/// window for both sides of a comparison.
pub fn analyze_state(
    snapshot: &ScheduleSnapshot,
    reference: &ScheduleSnapshot,
    capacity_window: Option<DateRange>,
    baselines: &BTreeMap<ProjectId, Baseline>,
    config: &EngineConfig,
    warnings: &mut Warnings,
) -> Result<StateAnalysis, ScenarioError> {
    let cpm = CriticalPathResult::calculate(snapshot, config.critical_float_tolerance_minutes)?;
    let scheduled = cpm.scheduled_snapshot(snapshot);
    let capacity = CapacityEvaluation::evaluate_in(
        snapshot,
        capacity_window,
        config.overallocation_epsilon,
        warnings,
    );

    let mut earned = Vec::new();
    for project_id in &snapshot.scope.project_ids {
        match EarnedValueInput::from_snapshot(&scheduled, project_id, baselines.get(project_id)) {
            Some(input) => earned.push(earned_value::calculate(&input)),
            None => warnings.push(ScenarioWarning::MissingFinancials {
                project_id: project_id.clone(),
            }),
        }
    }
    let (aggregate_cpi, aggregate_spi) = aggregate_indices(&earned);

    let mut slip: Option<i64> = None;
    let mut drift: Option<i64> = None;
    for project_id in &snapshot.scope.project_ids {
        let Some(finish) = cpm.project_finish_for(project_id) else {
            continue;
        };
        let (project_slip, project_drift) = match baselines.get(project_id) {
            Some(b) => {
                let comparison = baseline::compare(b, &scheduled);
                (
                    comparison.critical_path_slip_minutes,
                    comparison.finish_variance_minutes.unwrap_or(0),
                )
            }
            None => {
                let planned = reference.planned_finish_for(project_id).unwrap_or(finish);
                ((finish - planned).num_minutes(), 0)
            }
        };
        slip = Some(slip.map_or(project_slip, |s| s.max(project_slip)));
        drift = Some(drift.map_or(project_drift, |d| d.max(project_drift)));
    }

    let state = ScenarioStateSnapshot {
        total_capacity_hours: capacity.total_capacity_hours,
        total_demand_hours: capacity.total_demand_hours,
        overallocated_days: capacity.overallocated_days,
        overallocated_users: capacity.overallocated_users,
        aggregate_cpi,
        aggregate_spi,
        critical_path_slip_minutes: slip.unwrap_or(0),
        baseline_drift_minutes: drift.unwrap_or(0),
        project_finish: cpm.project_finish,
        critical_task_count: cpm.critical_tasks.len() as u32,
    };

    Ok(StateAnalysis {
        state,
        cpm,
        scheduled,
    })
}

fn validate(snapshot: &ScheduleSnapshot) -> Result<(), ScenarioError> {
    validate_snapshot(snapshot).map_err(into_scenario_error)
}

/// Computes the before/after summary of a scenario.
///
/// `before` is never modified.
pub fn compute_summary(
    before: &ScheduleSnapshot,
    actions: &[ParsedAction],
    rosters: &BTreeMap<TeamId, Vec<UserId>>,
    baselines: &BTreeMap<ProjectId, Baseline>,
    config: &EngineConfig,
    warnings: &mut Warnings,
) -> Result<ScenarioSummary, ScenarioError> {
    validate(before)?;
    let after = apply_actions(before, actions, rosters, warnings);
    validate(&after)?;

    // Both sides share one capacity window so shifts do not change capacity.
    let window = match (evaluation_window(before), evaluation_window(&after)) {
        (Some(b), Some(a)) => Some(b.span(&a)),
        (b, a) => b.or(a),
    };
    let before_analysis = analyze_state(before, before, window, baselines, config, warnings)?;
    let after_analysis = analyze_state(&after, before, window, baselines, config, warnings)?;

    let impacted = impacted_projects(
        &before_analysis.scheduled,
        &before_analysis.cpm,
        &after_analysis.scheduled,
        &after_analysis.cpm,
    );

    Ok(ScenarioSummary {
        scope: before.scope.clone(),
        deltas: ScenarioDeltas::between(&before_analysis.state, &after_analysis.state),
        before: before_analysis.state,
        after: after_analysis.state,
        impacted_projects: impacted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::parse_actions;
    use crate::analysis::baseline::freeze_tasks;
    use crate::models::{
        CapacityCalendar, Dependency, ProjectFinancials, ResourceAllocation, ScenarioAction,
        ScheduledTask, Scope, MINUTES_PER_DAY,
    };
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde_json::json;

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    // January 2024: the 1st is a Monday.
    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn action(id: &str, action_type: &str, payload: serde_json::Value) -> ScenarioAction {
        ScenarioAction {
            id: id.into(),
            scenario_id: "s1".into(),
            action_type: action_type.into(),
            payload,
            created_at: at(1),
        }
    }

    fn chain() -> ScheduleSnapshot {
        ScheduleSnapshot::new(Scope::project("P1"), date(8), date(31))
            .with_task(ScheduledTask::new("A", "P1", at(1), at(6)).with_percent_complete(100.0))
            .with_task(ScheduledTask::new("B", "P1", at(6), at(11)).with_percent_complete(20.0))
            .with_task(ScheduledTask::new("C", "P1", at(11), at(16)))
            .with_task(ScheduledTask::new("D", "P1", at(1), at(3)).with_percent_complete(100.0))
            .with_dependency(Dependency::finish_to_start("A", "B"))
            .with_dependency(Dependency::finish_to_start("B", "C"))
            .with_financials(ProjectFinancials::new("P1", 1700.0).with_actual_cost(800.0))
    }

    fn run(
        before: &ScheduleSnapshot,
        actions: &[ScenarioAction],
        baselines: &BTreeMap<ProjectId, Baseline>,
    ) -> Result<(ScenarioSummary, Warnings), ScenarioError> {
        let parsed = parse_actions(actions)?;
        let mut warnings = Warnings::new();
        let summary = compute_summary(
            before,
            &parsed,
            &BTreeMap::new(),
            baselines,
            &EngineConfig::default(),
            &mut warnings,
        )?;
        Ok((summary, warnings))
    }

    #[test]
    fn test_shift_project_slips_critical_path() {
        let shift = [action(
            "a1",
            "shift_project",
            json!({"projectId": "P1", "shiftDays": 7}),
        )];
        let (summary, _) = run(&chain(), &shift, &BTreeMap::new()).unwrap();
        assert_eq!(summary.before.critical_path_slip_minutes, 0);
        assert_eq!(summary.deltas.critical_path_slip_minutes_delta, 7 * MINUTES_PER_DAY);
        assert_eq!(summary.after.critical_task_count, 3);
        assert_eq!(summary.impacted_projects.len(), 1);
    }

    #[test]
    fn test_shift_project_against_active_baseline() {
        let before = chain();
        let cpm = CriticalPathResult::calculate(&before, MINUTES_PER_DAY).unwrap();
        let scheduled = cpm.scheduled_snapshot(&before);
        let baseline = Baseline {
            id: "b1".into(),
            project_id: "P1".into(),
            name: "v1".into(),
            is_active: true,
            created_at: at(1),
            tasks: freeze_tasks(&scheduled, &cpm, &"P1".into()),
        };
        let baselines = BTreeMap::from([(ProjectId::from("P1"), baseline)]);

        let shift = [action(
            "a1",
            "shift_project",
            json!({"projectId": "P1", "shiftDays": 7}),
        )];
        let (summary, _) = run(&before, &shift, &baselines).unwrap();
        assert_eq!(summary.before.critical_path_slip_minutes, 0);
        assert_eq!(summary.after.critical_path_slip_minutes, 7 * MINUTES_PER_DAY);
        assert_eq!(summary.deltas.critical_path_slip_minutes_delta, 7 * MINUTES_PER_DAY);
        assert_eq!(summary.deltas.baseline_drift_minutes_delta, 7 * MINUTES_PER_DAY);
        // PV follows the baseline, so a later schedule does not change SPI
        assert_eq!(summary.deltas.aggregate_spi_delta, Some(0.0));
    }

    #[test]
    fn test_earned_value_figures_in_summary() {
        let (summary, warnings) = run(&chain(), &[], &BTreeMap::new()).unwrap();
        // Budgets by duration: A 500, B 500, C 500, D 200.
        // EV = 500 + 100 + 0 + 200 = 800, AC = 800
        assert!((summary.before.aggregate_cpi.unwrap() - 1.0).abs() < 1e-9);
        assert!(summary.before.aggregate_spi.is_some());
        assert_eq!(summary.deltas.aggregate_cpi_delta, Some(0.0));
        assert!(summary.impacted_projects.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_financials_nulls_ratios() {
        let mut before = chain();
        before.financials.clear();
        let (summary, warnings) = run(&before, &[], &BTreeMap::new()).unwrap();
        assert!(summary.before.aggregate_cpi.is_none());
        assert!(summary.deltas.aggregate_cpi_delta.is_none());
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ScenarioWarning::MissingFinancials { .. })));
    }

    #[test]
    fn test_change_capacity_removes_overallocation() {
        let before = chain()
            .with_capacity(CapacityCalendar::new("u1", 8.0))
            .with_allocation(ResourceAllocation::new("X1", "u1", "P1", 60.0, date(1), Some(date(2))))
            .with_allocation(ResourceAllocation::new("X2", "u1", "P1", 60.0, date(1), Some(date(2))));
        let raise = [action(
            "a1",
            "change_capacity",
            json!({"userId": "u1", "deltaPercent": 25}),
        )];
        let (summary, warnings) = run(&before, &raise, &BTreeMap::new()).unwrap();

        assert_eq!(summary.before.overallocated_days, 2);
        assert_eq!(summary.before.overallocated_users, 1);
        assert_eq!(summary.after.overallocated_days, 0);
        assert_eq!(summary.deltas.overallocated_days_delta, -2);
        assert_eq!(summary.deltas.overallocated_users_delta, -1);
        assert!(summary.deltas.total_capacity_hours_delta > 0.0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_shift_keeps_capacity_hours() {
        let before = ScheduleSnapshot::new(
            Scope::portfolio("pf", vec!["P1".into(), "P2".into()]),
            date(1),
            date(31),
        )
        .with_task(ScheduledTask::new("A", "P1", at(1), at(6)))
        .with_task(ScheduledTask::new("X", "P2", at(1), at(3)))
        .with_capacity(CapacityCalendar::new("u1", 8.0))
        .with_capacity(CapacityCalendar::new("u2", 8.0))
        .with_allocation(ResourceAllocation::new("AL1", "u1", "P1", 50.0, date(1), Some(date(5))))
        .with_allocation(ResourceAllocation::new("AL2", "u2", "P2", 50.0, date(1), Some(date(5))));
        let shift = [action(
            "a1",
            "shift_project",
            json!({"projectId": "P1", "shiftDays": 14}),
        )];
        let (summary, _) = run(&before, &shift, &BTreeMap::new()).unwrap();

        // Jan 1..19 holds 15 working days for each of the two users.
        assert!((summary.before.total_capacity_hours - 240.0).abs() < 1e-9);
        assert_eq!(summary.deltas.total_capacity_hours_delta, 0.0);
        assert!(summary.deltas.total_demand_hours_delta.abs() < 1e-9);
        assert_eq!(summary.deltas.overallocated_days_delta, 0);
    }

    #[test]
    fn test_cross_project_dependents_reschedule() {
        let before = ScheduleSnapshot::new(
            Scope::portfolio("pf", vec!["P1".into(), "P2".into()]),
            date(1),
            date(31),
        )
        .with_task(ScheduledTask::new("A", "P1", at(1), at(6)))
        .with_task(ScheduledTask::new("X", "P2", at(6), at(10)))
        .with_dependency(Dependency::finish_to_start("A", "X"));
        let shift = [action(
            "a1",
            "shift_project",
            json!({"projectId": "P1", "shiftDays": 7}),
        )];

        // Only P1 records move when the action is applied.
        let parsed = parse_actions(&shift).unwrap();
        let mut warnings = Warnings::new();
        let after = apply_actions(&before, &parsed, &BTreeMap::new(), &mut warnings);
        assert_eq!(after.task(&"X".into()).unwrap().start, at(6));

        // Scheduling pushes X behind its moved predecessor.
        let analysis = analyze_state(
            &after,
            &before,
            None,
            &BTreeMap::new(),
            &EngineConfig::default(),
            &mut warnings,
        )
        .unwrap();
        let x = analysis.scheduled.task(&"X".into()).unwrap();
        assert_eq!((x.start, x.end), (at(13), at(17)));

        let (summary, _) = run(&before, &shift, &BTreeMap::new()).unwrap();
        let p2 = summary
            .impacted_projects
            .iter()
            .find(|p| p.project_id.as_str() == "P2")
            .unwrap();
        assert!(p2.reason.contains("rescheduled"), "{}", p2.reason);
    }

    #[test]
    fn test_cycle_is_fatal() {
        let before = chain().with_dependency(Dependency::finish_to_start("C", "A"));
        let err = run(&before, &[], &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ScenarioError::CyclicDependency { .. }));
    }

    #[test]
    fn test_empty_scope_is_zeroed() {
        let empty = ScheduleSnapshot::new(Scope::project("P0"), date(1), date(31));
        let (summary, _) = run(&empty, &[], &BTreeMap::new()).unwrap();
        assert_eq!(summary.before, ScenarioStateSnapshot::default());
        assert_eq!(summary.after, ScenarioStateSnapshot::default());
        assert!(summary.impacted_projects.is_empty());
    }

    fn random_snapshot(seed: u64) -> ScheduleSnapshot {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut s = ScheduleSnapshot::new(
            Scope::portfolio("pf", vec!["P1".into(), "P2".into()]),
            date(10),
            date(31),
        );
        let n = 25;
        for i in 0..n {
            let start = rng.random_range(1..20);
            let len = rng.random_range(1..6);
            let project = if i % 2 == 0 { "P1" } else { "P2" };
            s = s.with_task(
                ScheduledTask::new(format!("T{i:02}"), project, at(start), at(start + len))
                    .with_percent_complete(rng.random_range(0..=100) as f64),
            );
        }
        // Edges only go from lower to higher index, so the graph stays acyclic.
        for _ in 0..40 {
            let a = rng.random_range(0..n - 1);
            let b = rng.random_range(a + 1..n);
            s = s.with_dependency(
                Dependency::finish_to_start(format!("T{a:02}"), format!("T{b:02}"))
                    .with_lag_days(rng.random_range(0..3)),
            );
        }
        for u in 0..4 {
            s = s
                .with_capacity(CapacityCalendar::new(format!("u{u}"), 8.0))
                .with_allocation(ResourceAllocation::new(
                    format!("AL{u}"),
                    format!("u{u}"),
                    "P1",
                    rng.random_range(20..90) as f64,
                    date(rng.random_range(1..10)),
                    Some(date(rng.random_range(10..28))),
                ));
        }
        s.with_financials(ProjectFinancials::new("P1", 5000.0).with_actual_cost(1200.0))
            .with_financials(ProjectFinancials::new("P2", 3000.0).with_actual_cost(900.0))
    }

    #[test]
    fn test_compute_is_deterministic() {
        let actions = [
            action("a1", "shift_project", json!({"projectId": "P2", "shiftDays": 3})),
            action("a2", "change_capacity", json!({"userId": "u1", "deltaPercent": -30})),
            action("a3", "shift_task", json!({"taskId": "T03", "shiftDays": 2})),
        ];
        for seed in [7, 42, 1234] {
            let before = random_snapshot(seed);
            let first = run(&before, &actions, &BTreeMap::new()).unwrap();
            let second = run(&before.clone(), &actions, &BTreeMap::new()).unwrap();
            assert_eq!(
                serde_json::to_string(&first.0).unwrap(),
                serde_json::to_string(&second.0).unwrap()
            );
            assert_eq!(first.1.to_strings(), second.1.to_strings());
        }
    }

    #[test]
    fn test_before_snapshot_untouched_by_compute() {
        let before = random_snapshot(99);
        let original = serde_json::to_value(&before).unwrap();
        let actions = [action("a1", "shift_project", json!({"projectId": "P1", "shiftDays": 5}))];
        run(&before, &actions, &BTreeMap::new()).unwrap();
        assert_eq!(serde_json::to_value(&before).unwrap(), original);
    }
}
