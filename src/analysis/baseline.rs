//! Baseline freezing and comparison.
//!
//! Baselines store the propagated (early) dates of a project, so comparing
//! a freshly created baseline against the same schedule reports no variance.

use std::collections::BTreeSet;

use crate::analysis::CriticalPathResult;
use crate::models::{
    Baseline, BaselineCompareResult, BaselineTask, ProjectId, ScheduleSnapshot, TaskId,
    TaskVariance, VarianceStatus,
};

/// Freezes a project's tasks from a scheduled snapshot.
///
/// `cpm` must be the critical path result the snapshot was scheduled from.
pub fn freeze_tasks(
    scheduled: &ScheduleSnapshot,
    cpm: &CriticalPathResult,
    project_id: &ProjectId,
) -> Vec<BaselineTask> {
    scheduled
        .tasks_for_project(project_id)
        .map(|task| BaselineTask {
            task_id: task.id.clone(),
            title: task.title.clone(),
            start: task.start,
            end: task.end,
            is_critical: cpm.is_critical(&task.id),
        })
        .collect()
}

/// Compares a baseline with the current scheduled snapshot.
pub fn compare(baseline: &Baseline, scheduled: &ScheduleSnapshot) -> BaselineCompareResult {
    let mut tasks = Vec::with_capacity(baseline.tasks.len());
    let mut count_late = 0;
    let mut max_slip_minutes = 0;
    let mut critical_slip: Option<i64> = None;

    for frozen in &baseline.tasks {
        let current = scheduled
            .task(&frozen.task_id)
            .filter(|t| t.project_id == baseline.project_id);

        let variance = match current {
            None => TaskVariance {
                task_id: frozen.task_id.clone(),
                title: frozen.title.clone(),
                baseline_end: frozen.end,
                current_end: None,
                end_variance_minutes: None,
                start_variance_minutes: None,
                is_critical_in_baseline: frozen.is_critical,
                status: VarianceStatus::TaskRemoved,
            },
            Some(task) => {
                let end_variance = (task.end - frozen.end).num_minutes();
                let status = match end_variance {
                    v if v > 0 => VarianceStatus::Late,
                    v if v < 0 => VarianceStatus::Early,
                    _ => VarianceStatus::OnTrack,
                };
                if status == VarianceStatus::Late {
                    count_late += 1;
                }
                max_slip_minutes = max_slip_minutes.max(end_variance);
                if frozen.is_critical {
                    critical_slip = Some(critical_slip.map_or(end_variance, |s| s.max(end_variance)));
                }
                TaskVariance {
                    task_id: frozen.task_id.clone(),
                    title: frozen.title.clone(),
                    baseline_end: frozen.end,
                    current_end: Some(task.end),
                    end_variance_minutes: Some(end_variance),
                    start_variance_minutes: Some((task.start - frozen.start).num_minutes()),
                    is_critical_in_baseline: frozen.is_critical,
                    status,
                }
            }
        };
        tasks.push(variance);
    }

    let known: BTreeSet<&TaskId> = baseline.tasks.iter().map(|t| &t.task_id).collect();
    let added_task_ids = scheduled
        .tasks_for_project(&baseline.project_id)
        .filter(|t| !known.contains(&t.id))
        .map(|t| t.id.clone())
        .collect();

    let finish_variance_minutes = match (
        scheduled.planned_finish_for(&baseline.project_id),
        baseline.finish(),
    ) {
        (Some(current), Some(frozen)) => Some((current - frozen).num_minutes()),
        _ => None,
    };

    BaselineCompareResult {
        baseline_id: baseline.id.clone(),
        project_id: baseline.project_id.clone(),
        tasks,
        added_task_ids,
        count_late,
        max_slip_minutes,
        critical_path_slip_minutes: critical_slip.unwrap_or(0),
        finish_variance_minutes,
    }
}
