//! Critical path method (CPM).
//!
//! # Algorithm
//!
//! 1. Topologically sort the dependency graph (cycles are fatal).
//! 2. Forward pass: a task starts no earlier than its planned start and no
//!    earlier than any dependency allows.
//! 3. Backward pass from the project finish (latest early finish).
//! 4. Float = late start − early start; a task is critical when its float is
//!    below the tolerance (default: less than one calendar day).
//!
//! | Link | Forward (successor) | Backward (predecessor) |
//! |------|---------------------|------------------------|
//! | FS | ES ≥ EF_p + lag | LF ≤ LS_s − lag |
//! | SS | ES ≥ ES_p + lag | LF ≤ LS_s − lag + d |
//! | FF | EF ≥ EF_p + lag | LF ≤ LF_s − lag |
//! | SF | EF ≥ ES_p + lag | LF ≤ LF_s − lag + d |
//!
//! All arithmetic is in whole minutes relative to the earliest planned start.
//!
//! # Reference
//! Kelley & Walker (1959), "Critical-Path Planning and Scheduling"

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::ScenarioError;
use crate::graph::{Edge, ScheduleGraph};
use crate::models::{DependencyType, ProjectId, ScheduleSnapshot, TaskId, MINUTES_PER_DAY};

/// Default critical float tolerance: same calendar day.
pub const DEFAULT_CRITICAL_TOLERANCE_MINUTES: i64 = MINUTES_PER_DAY;

/// CPM timing of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTiming {
    pub task_id: TaskId,
    pub project_id: ProjectId,
    pub early_start: DateTime<Utc>,
    pub early_finish: DateTime<Utc>,
    pub late_start: DateTime<Utc>,
    pub late_finish: DateTime<Utc>,
    pub total_float_minutes: i64,
    pub is_critical: bool,
}

/// Output of a critical path run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPathResult {
    /// Timings in snapshot task order.
    pub timings: Vec<TaskTiming>,
    pub critical_tasks: BTreeSet<TaskId>,
    /// Tight dependencies between critical tasks.
    pub critical_edges: Vec<(TaskId, TaskId)>,
    pub project_start: Option<DateTime<Utc>>,
    pub project_finish: Option<DateTime<Utc>>,
    pub duration_minutes: i64,
}

impl CriticalPathResult {
    /// Runs CPM on a snapshot.
    ///
    /// An empty snapshot yields an empty result.
    ///
    /// # Errors
    /// `CyclicDependency` if the graph has a cycle, `InvalidSchedule` if a
    /// dependency references an unknown task.
    pub fn calculate(
        snapshot: &ScheduleSnapshot,
        tolerance_minutes: i64,
    ) -> Result<Self, ScenarioError> {
        let graph = ScheduleGraph::build(snapshot)?;
        let order = graph.topological_order()?;
        let Some(epoch) = snapshot.planned_start() else {
            return Ok(Self::default());
        };

        let n = graph.node_count();
        let duration: Vec<i64> = (0..n).map(|i| graph.task(i).duration_minutes()).collect();
        let planned: Vec<i64> = (0..n)
            .map(|i| (graph.task(i).start - epoch).num_minutes())
            .collect();

        // Forward pass
        let mut es = vec![0i64; n];
        let mut ef = vec![0i64; n];
        for &j in &order {
            let mut start = planned[j];
            for edge in graph.predecessors(j) {
                start = start.max(forward_bound(edge, es[edge.node], ef[edge.node], duration[j]));
            }
            es[j] = start;
            ef[j] = start + duration[j];
        }

        let finish = ef.iter().copied().max().unwrap_or(0);
        let start = es.iter().copied().min().unwrap_or(0);

        // Backward pass
        let mut ls = vec![0i64; n];
        let mut lf = vec![0i64; n];
        for &i in order.iter().rev() {
            let mut late_finish = finish;
            for edge in graph.successors(i) {
                late_finish = late_finish.min(backward_bound(
                    edge,
                    ls[edge.node],
                    lf[edge.node],
                    duration[i],
                ));
            }
            lf[i] = late_finish;
            ls[i] = late_finish - duration[i];
        }

        let at = |minutes: i64| epoch + Duration::minutes(minutes);
        let mut timings = Vec::with_capacity(n);
        let mut critical_tasks = BTreeSet::new();
        for i in 0..n {
            let task = graph.task(i);
            let total_float = ls[i] - es[i];
            let is_critical = total_float < tolerance_minutes;
            if is_critical {
                critical_tasks.insert(task.id.clone());
            }
            timings.push(TaskTiming {
                task_id: task.id.clone(),
                project_id: task.project_id.clone(),
                early_start: at(es[i]),
                early_finish: at(ef[i]),
                late_start: at(ls[i]),
                late_finish: at(lf[i]),
                total_float_minutes: total_float,
                is_critical,
            });
        }

        let mut critical_edges = Vec::new();
        for i in 0..n {
            if !timings[i].is_critical {
                continue;
            }
            for edge in graph.successors(i) {
                let j = edge.node;
                if timings[j].is_critical && is_tight(edge, es[i], ef[i], es[j], ef[j]) {
                    critical_edges.push((graph.task(i).id.clone(), graph.task(j).id.clone()));
                }
            }
        }
        critical_edges.sort();

        Ok(Self {
            timings,
            critical_tasks,
            critical_edges,
            project_start: Some(at(start)),
            project_finish: Some(at(finish)),
            duration_minutes: finish - start,
        })
    }

    pub fn timing(&self, task_id: &TaskId) -> Option<&TaskTiming> {
        self.timings.iter().find(|t| &t.task_id == task_id)
    }

    pub fn is_critical(&self, task_id: &TaskId) -> bool {
        self.critical_tasks.contains(task_id)
    }

    /// Latest early finish among a project's tasks.
    pub fn project_finish_for(&self, project_id: &ProjectId) -> Option<DateTime<Utc>> {
        self.timings
            .iter()
            .filter(|t| &t.project_id == project_id)
            .map(|t| t.early_finish)
            .max()
    }

    /// Copy of `snapshot` with every task moved to its early dates.
    ///
    /// Tasks whose dates do not change keep sharing their record with
    /// `snapshot`. `self` must come from the same snapshot.
    pub fn scheduled_snapshot(&self, snapshot: &ScheduleSnapshot) -> ScheduleSnapshot {
        let mut scheduled = snapshot.clone();
        for (task, timing) in scheduled.tasks.iter_mut().zip(&self.timings) {
            if task.start != timing.early_start || task.end != timing.early_finish {
                let task = Arc::make_mut(task);
                task.start = timing.early_start;
                task.end = timing.early_finish;
            }
        }
        scheduled
    }
}

fn forward_bound(edge: &Edge, pred_es: i64, pred_ef: i64, duration: i64) -> i64 {
    match edge.dependency_type {
        DependencyType::FinishToStart => pred_ef + edge.lag_minutes,
        DependencyType::StartToStart => pred_es + edge.lag_minutes,
        DependencyType::FinishToFinish => pred_ef + edge.lag_minutes - duration,
        DependencyType::StartToFinish => pred_es + edge.lag_minutes - duration,
    }
}

fn backward_bound(edge: &Edge, succ_ls: i64, succ_lf: i64, duration: i64) -> i64 {
    match edge.dependency_type {
        DependencyType::FinishToStart => succ_ls - edge.lag_minutes,
        DependencyType::StartToStart => succ_ls - edge.lag_minutes + duration,
        DependencyType::FinishToFinish => succ_lf - edge.lag_minutes,
        DependencyType::StartToFinish => succ_lf - edge.lag_minutes + duration,
    }
}

fn is_tight(edge: &Edge, pred_es: i64, pred_ef: i64, succ_es: i64, succ_ef: i64) -> bool {
    match edge.dependency_type {
        DependencyType::FinishToStart => succ_es == pred_ef + edge.lag_minutes,
        DependencyType::StartToStart => succ_es == pred_es + edge.lag_minutes,
        DependencyType::FinishToFinish => succ_ef == pred_ef + edge.lag_minutes,
        DependencyType::StartToFinish => succ_ef == pred_es + edge.lag_minutes,
    }
}
