//! Earned value management (EVM).
//!
//! # Formulas
//!
//! | Figure | Definition |
//! |--------|------------|
//! | PV | Σ task budget × scheduled fraction at the end of the as-of day |
//! | EV | Σ task budget × percent complete / 100 |
//! | AC | actual cost to date (0 when none recorded) |
//! | CPI | EV / AC, `None` when AC = 0 |
//! | SPI | EV / PV, `None` when PV = 0 |
//! | EAC | BAC / CPI when CPI > 0, else AC + (BAC − EV) with actuals, else BAC |
//! | ETC | EAC − AC |
//! | VAC | BAC − EAC |
//! | CV | EV − AC |
//! | SV | EV − PV |
//!
//! Task budgets split BAC by planned cost when every task has one, by
//! duration otherwise, and evenly as a last resort.
//!
//! # Reference
//! PMI (2019), "The Standard for Earned Value Management"

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::models::{
    Baseline, EarnedValueData, ProjectId, ProjectFinancials, ScheduleSnapshot, ScheduledTask,
};

/// Everything needed to compute earned value for one project.
#[derive(Debug, Clone)]
pub struct EarnedValueInput<'a> {
    pub project_id: ProjectId,
    pub as_of: NaiveDate,
    pub budget_at_completion: f64,
    pub actual_cost: Option<f64>,
    /// Used for EV when the project has no tasks.
    pub aggregate_percent_complete: Option<f64>,
    pub tasks: Vec<&'a ScheduledTask>,
    /// Source of planned dates for PV; task dates are used when absent.
    pub baseline: Option<&'a Baseline>,
}

impl<'a> EarnedValueInput<'a> {
    /// Collects a project's inputs from a snapshot.
    ///
    /// Returns `None` when the snapshot holds no financials for the project.
    pub fn from_snapshot(
        snapshot: &'a ScheduleSnapshot,
        project_id: &ProjectId,
        baseline: Option<&'a Baseline>,
    ) -> Option<Self> {
        let financials = snapshot.financials.get(project_id)?;
        Some(Self::new(snapshot.as_of, financials, baseline).with_tasks(
            snapshot
                .tasks
                .iter()
                .map(|t| t.as_ref())
                .filter(|t| &t.project_id == project_id),
        ))
    }

    pub fn new(
        as_of: NaiveDate,
        financials: &ProjectFinancials,
        baseline: Option<&'a Baseline>,
    ) -> Self {
        Self {
            project_id: financials.project_id.clone(),
            as_of,
            budget_at_completion: financials.budget_at_completion,
            actual_cost: financials.actual_cost,
            aggregate_percent_complete: financials.percent_complete,
            tasks: Vec::new(),
            baseline,
        }
    }

    pub fn with_tasks(mut self, tasks: impl IntoIterator<Item = &'a ScheduledTask>) -> Self {
        self.tasks.extend(tasks);
        self
    }
}

/// Computes earned value figures. Never yields NaN or infinities.
pub fn calculate(input: &EarnedValueInput<'_>) -> EarnedValueData {
    let bac = input.budget_at_completion;
    let budgets = task_budgets(bac, &input.tasks);
    let cutoff = end_of_day(input.as_of);

    let (pv, ev) = if input.tasks.is_empty() {
        let percent = input.aggregate_percent_complete.unwrap_or(0.0);
        (0.0, bac * percent / 100.0)
    } else {
        input
            .tasks
            .iter()
            .zip(&budgets)
            .fold((0.0, 0.0), |(pv, ev), (task, budget)| {
                let (start, end) = planned_dates(task, input.baseline);
                (
                    pv + budget * scheduled_fraction(start, end, cutoff),
                    ev + budget * task.percent_complete / 100.0,
                )
            })
    };

    let ac = input.actual_cost.unwrap_or(0.0);
    let cpi = ratio(ev, ac);
    let spi = ratio(ev, pv);

    let eac = match cpi {
        Some(cpi) if cpi > 0.0 => bac / cpi,
        _ if input.actual_cost.is_some() => ac + (bac - ev),
        _ => bac,
    };

    EarnedValueData {
        project_id: input.project_id.clone(),
        as_of: input.as_of,
        bac,
        pv,
        ev,
        ac,
        cpi,
        spi,
        eac,
        etc: eac - ac,
        vac: bac - eac,
        cv: ev - ac,
        sv: ev - pv,
    }
}

/// Totals-weighted CPI and SPI across projects: ΣEV/ΣAC and ΣEV/ΣPV.
pub fn aggregate_indices(data: &[EarnedValueData]) -> (Option<f64>, Option<f64>) {
    let ev: f64 = data.iter().map(|d| d.ev).sum();
    let ac: f64 = data.iter().map(|d| d.ac).sum();
    let pv: f64 = data.iter().map(|d| d.pv).sum();
    (ratio(ev, ac), ratio(ev, pv))
}

/// `numerator / denominator`, or `None` when that is not a finite number.
fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator).filter(|r| r.is_finite())
}

/// Splits BAC across tasks.
fn task_budgets(bac: f64, tasks: &[&ScheduledTask]) -> Vec<f64> {
    if tasks.is_empty() {
        return Vec::new();
    }

    let costs: Option<Vec<f64>> = tasks.iter().map(|t| t.planned_cost).collect();
    let weights = match costs {
        Some(costs) if costs.iter().sum::<f64>() > 0.0 => costs,
        _ => {
            let durations: Vec<f64> = tasks.iter().map(|t| t.duration_minutes() as f64).collect();
            if durations.iter().sum::<f64>() > 0.0 {
                durations
            } else {
                vec![1.0; tasks.len()]
            }
        }
    };

    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| bac * w / total).collect()
}

fn planned_dates(
    task: &ScheduledTask,
    baseline: Option<&Baseline>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    baseline
        .and_then(|b| b.task(&task.id))
        .map_or((task.start, task.end), |b| (b.start, b.end))
}

/// First instant after `date`.
fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    (date + Duration::days(1)).and_time(NaiveTime::MIN).and_utc()
}

/// Share of `[start, end]` elapsed at `cutoff`, in `0.0..=1.0`.
fn scheduled_fraction(start: DateTime<Utc>, end: DateTime<Utc>, cutoff: DateTime<Utc>) -> f64 {
    if cutoff >= end {
        return 1.0;
    }
    if cutoff <= start {
        return 0.0;
    }
    let elapsed = (cutoff - start).num_seconds() as f64;
    let total = (end - start).num_seconds() as f64;
    (elapsed / total).clamp(0.0, 1.0)
}
