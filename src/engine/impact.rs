//! Impacted project detection.

use std::collections::BTreeMap;

use crate::analysis::CriticalPathResult;
use crate::models::{ImpactedProject, ProjectId, ScheduleSnapshot};

#[derive(Debug, Default)]
struct Changes {
    rescheduled: usize,
    allocations: usize,
    criticality: usize,
    budget: bool,
}

impl Changes {
    fn is_empty(&self) -> bool {
        self.rescheduled == 0 && self.allocations == 0 && self.criticality == 0 && !self.budget
    }

    fn reason(&self) -> String {
        let mut parts = Vec::new();
        if self.rescheduled > 0 {
            parts.push(format!("{} task(s) rescheduled", self.rescheduled));
        }
        if self.allocations > 0 {
            parts.push(format!("{} allocation(s) changed", self.allocations));
        }
        if self.criticality > 0 {
            parts.push(format!(
                "critical path membership changed for {} task(s)",
                self.criticality
            ));
        }
        if self.budget {
            parts.push("budget changed".to_string());
        }
        parts.join("; ")
    }
}

/// Projects whose scheduled dates, allocations, critical tasks or budget
/// differ between the two sides, ordered by project id.
///
/// Both snapshots must be scheduled snapshots of the same scope, and each
/// CPM result must belong to its snapshot.
pub fn impacted_projects(
    before: &ScheduleSnapshot,
    before_cpm: &CriticalPathResult,
    after: &ScheduleSnapshot,
    after_cpm: &CriticalPathResult,
) -> Vec<ImpactedProject> {
    let mut changes: BTreeMap<ProjectId, Changes> = BTreeMap::new();

    for task in &before.tasks {
        let entry = changes.entry(task.project_id.clone()).or_default();
        match after.task(&task.id) {
            Some(other) if other.start == task.start && other.end == task.end => {}
            _ => entry.rescheduled += 1,
        }
        if before_cpm.is_critical(&task.id) != after_cpm.is_critical(&task.id) {
            entry.criticality += 1;
        }
    }

    let after_allocations: BTreeMap<_, _> = after
        .allocations
        .iter()
        .map(|a| (&a.id, a.as_ref()))
        .collect();
    for alloc in &before.allocations {
        if after_allocations.get(&alloc.id) != Some(&alloc.as_ref()) {
            changes
                .entry(alloc.project_id.clone())
                .or_default()
                .allocations += 1;
        }
    }

    for (project_id, financials) in &before.financials {
        let after_bac = after
            .financials
            .get(project_id)
            .map(|f| f.budget_at_completion);
        if after_bac != Some(financials.budget_at_completion) {
            changes.entry(project_id.clone()).or_default().budget = true;
        }
    }

    changes
        .into_iter()
        .filter(|(_, c)| !c.is_empty())
        .map(|(project_id, c)| ImpactedProject {
            reason: c.reason(),
            project_id,
        })
        .collect()
}
