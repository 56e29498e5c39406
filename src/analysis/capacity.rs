//! Resource capacity evaluation.
//!
//! Buckets allocation demand by (user, calendar day) and compares it with
//! the user's capacity on that day.
//!
//! # Rules
//! - The evaluation window runs from the earliest allocation start to the
//!   latest effective allocation end; open-ended allocations end at the
//!   snapshot horizon. Comparisons of two snapshots evaluate both over the
//!   span of their windows.
//! - Only the user's working weekdays are bucketed.
//! - Capacity factor = 1 + Σ matching adjustment percent / 100, floored at
//!   zero. Blocked days have factor 0.
//! - A user-day is overallocated iff its summed percent exceeds
//!   `100 × factor` by more than epsilon.
//! - Users without a calendar are left out of every figure.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ScenarioWarning, Warnings};
use crate::models::{CapacityCalendar, DateRange, ScheduleSnapshot, UserId};

/// Capacity figures for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCapacity {
    pub user_id: UserId,
    pub capacity_hours: f64,
    pub demand_hours: f64,
    pub overallocated_days: u32,
    /// Highest summed allocation percent on any day.
    pub peak_percent: f64,
}

impl UserCapacity {
    pub fn is_overallocated(&self) -> bool {
        self.overallocated_days > 0
    }
}

/// Capacity figures for a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityEvaluation {
    pub window: Option<DateRange>,
    pub total_capacity_hours: f64,
    pub total_demand_hours: f64,
    pub overallocated_days: u32,
    pub overallocated_users: u32,
    /// Per-user breakdown, ordered by user id.
    pub users: Vec<UserCapacity>,
}

impl CapacityEvaluation {
    /// Evaluates every allocated user of `snapshot` over its own window.
    ///
    /// Users without capacity data produce a `MissingCapacityData` warning.
    pub fn evaluate(snapshot: &ScheduleSnapshot, epsilon: f64, warnings: &mut Warnings) -> Self {
        Self::evaluate_in(snapshot, evaluation_window(snapshot), epsilon, warnings)
    }

    /// Evaluates every allocated user of `snapshot` over `window`.
    ///
    /// A snapshot without allocations yields the default evaluation.
    pub fn evaluate_in(
        snapshot: &ScheduleSnapshot,
        window: Option<DateRange>,
        epsilon: f64,
        warnings: &mut Warnings,
    ) -> Self {
        let Some(window) = window.filter(|_| !snapshot.allocations.is_empty()) else {
            return Self::default();
        };

        let mut evaluation = Self {
            window: Some(window),
            ..Self::default()
        };

        for user_id in snapshot.allocated_user_ids() {
            let Some(calendar) = snapshot.capacities.get(&user_id) else {
                warnings.push(ScenarioWarning::MissingCapacityData { user_id });
                continue;
            };
            let user = evaluate_user(snapshot, calendar, &window, epsilon);

            evaluation.total_capacity_hours += user.capacity_hours;
            evaluation.total_demand_hours += user.demand_hours;
            evaluation.overallocated_days += user.overallocated_days;
            if user.is_overallocated() {
                evaluation.overallocated_users += 1;
            }
            evaluation.users.push(user);
        }

        evaluation
    }

    pub fn user(&self, user_id: &UserId) -> Option<&UserCapacity> {
        self.users.iter().find(|u| &u.user_id == user_id)
    }
}

/// `[min allocation start, max effective allocation end]`.
pub fn evaluation_window(snapshot: &ScheduleSnapshot) -> Option<DateRange> {
    let start = snapshot.allocations.iter().map(|a| a.start_date).min()?;
    let end = snapshot
        .allocations
        .iter()
        .map(|a| a.effective_range(snapshot.horizon_end).end)
        .max()?;
    Some(DateRange::new(start, end))
}

fn evaluate_user(
    snapshot: &ScheduleSnapshot,
    calendar: &CapacityCalendar,
    window: &DateRange,
    epsilon: f64,
) -> UserCapacity {
    // Summed allocation percent per working day.
    let mut percent_by_day = BTreeMap::new();
    for alloc in snapshot.allocations_for_user(&calendar.user_id) {
        let Some(range) = alloc
            .effective_range(snapshot.horizon_end)
            .intersect(window)
        else {
            continue;
        };
        for day in range.iter_days() {
            if calendar.is_working_weekday(day) {
                *percent_by_day.entry(day).or_insert(0.0) += alloc.allocation_percent;
            }
        }
    }

    let factor_on = |day: NaiveDate| {
        if calendar.is_blocked(day) {
            return 0.0;
        }
        let delta: f64 = snapshot
            .capacity_adjustments
            .iter()
            .filter(|adj| adj.user_id == calendar.user_id && adj.applies_on(day))
            .map(|adj| adj.delta_percent / 100.0)
            .sum();
        (1.0 + delta).max(0.0)
    };

    let capacity_hours: f64 = window
        .iter_days()
        .map(|day| calendar.hours_on(day) * factor_on(day))
        .sum();

    let mut demand_hours = 0.0;
    let mut overallocated_days = 0;
    let mut peak_percent: f64 = 0.0;
    for (&day, &percent) in &percent_by_day {
        demand_hours += percent / 100.0 * calendar.hours_per_day;
        peak_percent = peak_percent.max(percent);
        if percent > 100.0 * factor_on(day) + epsilon {
            overallocated_days += 1;
        }
    }

    UserCapacity {
        user_id: calendar.user_id.clone(),
        capacity_hours,
        demand_hours,
        overallocated_days,
        peak_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CapacityAdjustment, ResourceAllocation, Scope};

    const EPS: f64 = 1e-9;

    // January 2024: the 1st is a Monday.
    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn snapshot() -> ScheduleSnapshot {
        ScheduleSnapshot::new(Scope::project("P1"), date(1), date(31))
            .with_capacity(CapacityCalendar::new("u1", 8.0))
    }

    fn alloc(id: &str, user: &str, pct: f64, from: u32, to: u32) -> ResourceAllocation {
        ResourceAllocation::new(id, user, "P1", pct, date(from), Some(date(to)))
    }

    fn evaluate(s: &ScheduleSnapshot) -> CapacityEvaluation {
        CapacityEvaluation::evaluate(s, EPS, &mut Warnings::new())
    }

    #[test]
    fn test_exactly_full_is_not_overallocated() {
        let s = snapshot().with_allocation(alloc("a1", "u1", 100.0, 1, 1));
        let e = evaluate(&s);
        assert_eq!(e.overallocated_days, 0);
        assert_eq!(e.overallocated_users, 0);
        assert!((e.total_demand_hours - 8.0).abs() < 1e-10);
        assert!((e.total_capacity_hours - 8.0).abs() < 1e-10);
    }

    #[test]
    fn test_just_over_full_is_overallocated() {
        let s = snapshot().with_allocation(alloc("a1", "u1", 100.01, 1, 1));
        let e = evaluate(&s);
        assert_eq!(e.overallocated_days, 1);
        assert_eq!(e.overallocated_users, 1);
    }

    #[test]
    fn test_overlapping_allocations_sum() {
        let s = snapshot()
            .with_allocation(alloc("a1", "u1", 60.0, 1, 2))
            .with_allocation(alloc("a2", "u1", 60.0, 1, 2));
        let e = evaluate(&s);
        assert_eq!(e.overallocated_days, 2);
        assert_eq!(e.overallocated_users, 1);
        assert!((e.user(&"u1".into()).unwrap().peak_percent - 120.0).abs() < 1e-10);
    }

    #[test]
    fn test_weekends_are_not_bucketed() {
        // Fri..Mon; Saturday and Sunday skipped
        let s = snapshot().with_allocation(alloc("a1", "u1", 150.0, 5, 8));
        let e = evaluate(&s);
        assert_eq!(e.overallocated_days, 2);
        assert!((e.total_demand_hours - 24.0).abs() < 1e-10);
        assert!((e.total_capacity_hours - 16.0).abs() < 1e-10);
    }

    #[test]
    fn test_blocked_day_has_no_capacity() {
        let s = ScheduleSnapshot::new(Scope::project("P1"), date(1), date(31))
            .with_capacity(CapacityCalendar::new("u1", 8.0).with_blocked(date(2), date(2)))
            .with_allocation(alloc("a1", "u1", 50.0, 1, 3));
        let e = evaluate(&s);
        assert_eq!(e.overallocated_days, 1);
        assert!((e.total_capacity_hours - 16.0).abs() < 1e-10);
    }

    #[test]
    fn test_capacity_adjustment_lifts_limit() {
        let mut s = snapshot()
            .with_allocation(alloc("a1", "u1", 60.0, 1, 2))
            .with_allocation(alloc("a2", "u1", 60.0, 1, 2));
        s.capacity_adjustments.push(CapacityAdjustment {
            user_id: "u1".into(),
            delta_percent: 25.0,
            range: None,
        });
        let e = evaluate(&s);
        assert_eq!(e.overallocated_days, 0);
        assert!((e.total_capacity_hours - 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_negative_adjustment_floors_at_zero() {
        let mut s = snapshot().with_allocation(alloc("a1", "u1", 10.0, 1, 1));
        s.capacity_adjustments.push(CapacityAdjustment {
            user_id: "u1".into(),
            delta_percent: -150.0,
            range: Some(DateRange::new(date(1), date(1))),
        });
        let e = evaluate(&s);
        assert_eq!(e.overallocated_days, 1);
        assert!(e.total_capacity_hours.abs() < 1e-10);
    }

    #[test]
    fn test_open_ended_allocation_runs_to_horizon() {
        let s = ScheduleSnapshot::new(Scope::project("P1"), date(1), date(7))
            .with_capacity(CapacityCalendar::new("u1", 8.0))
            .with_allocation(ResourceAllocation::new("a1", "u1", "P1", 50.0, date(1), None));
        let e = evaluate(&s);
        assert_eq!(e.window, Some(DateRange::new(date(1), date(7))));
        assert!((e.total_demand_hours - 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_missing_calendar_excluded_with_warning() {
        let s = snapshot()
            .with_allocation(alloc("a1", "u1", 50.0, 1, 1))
            .with_allocation(alloc("a2", "ghost", 500.0, 1, 1));
        let mut warnings = Warnings::new();
        let e = CapacityEvaluation::evaluate(&s, EPS, &mut warnings);
        assert_eq!(e.users.len(), 1);
        assert_eq!(e.overallocated_users, 0);
        assert!(warnings.iter().any(|w| matches!(
            w,
            ScenarioWarning::MissingCapacityData { user_id } if user_id.as_str() == "ghost"
        )));
    }

    #[test]
    fn test_shared_window_counts_idle_days() {
        let s = snapshot().with_allocation(alloc("a1", "u1", 50.0, 1, 5));
        let own = evaluate(&s);
        let wide = CapacityEvaluation::evaluate_in(
            &s,
            Some(DateRange::new(date(1), date(12))),
            EPS,
            &mut Warnings::new(),
        );
        assert!((own.total_capacity_hours - 40.0).abs() < 1e-10);
        assert!((wide.total_capacity_hours - 80.0).abs() < 1e-10);
        assert!((wide.total_demand_hours - own.total_demand_hours).abs() < 1e-10);
    }

    #[test]
    fn test_no_allocations() {
        let e = evaluate(&snapshot());
        assert_eq!(e, CapacityEvaluation::default());
        let window = Some(DateRange::new(date(1), date(5)));
        let e = CapacityEvaluation::evaluate_in(&snapshot(), window, EPS, &mut Warnings::new());
        assert_eq!(e, CapacityEvaluation::default());
    }
}
