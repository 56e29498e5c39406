//! Input validation for schedule snapshots.
//!
//! Checks structural integrity of a snapshot before analysis. Detects:
//! - Duplicate task IDs
//! - Dependencies referencing unknown tasks
//! - Tasks ending before they start
//! - Unusable allocations (negative or non-finite percent, inverted dates)
//! - Circular dependencies (DAG validation), including self-links
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::ScenarioError;
use crate::models::{ScheduleSnapshot, TaskId};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two tasks share the same ID.
    DuplicateId,
    /// A dependency references a task that isn't in the snapshot.
    InvalidDependencyReference,
    /// A task ends before it starts.
    InvalidDateRange,
    /// An allocation has an unusable percent or date range.
    InvalidAllocation,
    /// Dependency graph contains a cycle through this edge.
    CyclicDependency {
        predecessor: TaskId,
        successor: TaskId,
    },
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a snapshot.
///
/// Checks:
/// 1. No duplicate task IDs
/// 2. Every dependency endpoint is a task in the snapshot
/// 3. No task ends before it starts
/// 4. Allocation percents are finite and non-negative, end dates not before start
/// 5. No circular dependencies
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_snapshot(snapshot: &ScheduleSnapshot) -> ValidationResult {
    let mut errors = Vec::new();

    let mut task_ids = HashSet::new();
    for task in &snapshot.tasks {
        if !task_ids.insert(task.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate task ID: {}", task.id),
            ));
        }
        if task.end < task.start {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidDateRange,
                format!("Task '{}' ends before it starts", task.id),
            ));
        }
    }

    for dep in snapshot.dependencies.iter() {
        for endpoint in [&dep.predecessor_id, &dep.successor_id] {
            if !task_ids.contains(endpoint.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidDependencyReference,
                    format!(
                        "Dependency {} -> {} references unknown task '{}'",
                        dep.predecessor_id, dep.successor_id, endpoint
                    ),
                ));
            }
        }
    }

    for alloc in &snapshot.allocations {
        if !alloc.allocation_percent.is_finite() || alloc.allocation_percent < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidAllocation,
                format!(
                    "Allocation '{}' has invalid percent {}",
                    alloc.id, alloc.allocation_percent
                ),
            ));
        }
        if alloc.end_date.is_some_and(|end| end < alloc.start_date) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidAllocation,
                format!("Allocation '{}' ends before it starts", alloc.id),
            ));
        }
    }

    if let Some((predecessor, successor)) = find_cycle_edge(snapshot) {
        errors.push(ValidationError::new(
            ValidationErrorKind::CyclicDependency {
                predecessor: predecessor.clone(),
                successor: successor.clone(),
            },
            format!("Circular dependency detected at edge {predecessor} -> {successor}"),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Folds validation errors into the engine's fatal error.
///
/// A cycle wins over every other problem so callers can name the edge.
pub fn into_scenario_error(errors: Vec<ValidationError>) -> ScenarioError {
    for e in &errors {
        if let ValidationErrorKind::CyclicDependency {
            predecessor,
            successor,
        } = &e.kind
        {
            return ScenarioError::CyclicDependency {
                predecessor: predecessor.clone(),
                successor: successor.clone(),
            };
        }
    }
    let details: Vec<String> = errors.into_iter().map(|e| e.message).collect();
    ScenarioError::InvalidSchedule(details.join("; "))
}

/// Finds one edge that closes a cycle in the dependency graph.
///
/// # Algorithm
/// DFS over tasks in id order. The first back-edge found (an edge into a
/// node on the current recursion stack) is returned.
///
/// # Reference
/// Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
pub fn find_cycle_edge(snapshot: &ScheduleSnapshot) -> Option<(TaskId, TaskId)> {
    // Build adjacency list: predecessor → successors
    let mut adj: BTreeMap<&TaskId, BTreeSet<&TaskId>> = BTreeMap::new();
    for dep in snapshot.dependencies.iter() {
        adj.entry(&dep.predecessor_id)
            .or_default()
            .insert(&dep.successor_id);
    }

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    for task in &snapshot.tasks {
        if !visited.contains(&task.id) {
            if let Some((from, to)) = back_edge_dfs(&task.id, &adj, &mut visited, &mut in_stack) {
                return Some((from.clone(), to.clone()));
            }
        }
    }

    None
}

fn back_edge_dfs<'a>(
    node: &'a TaskId,
    adj: &BTreeMap<&'a TaskId, BTreeSet<&'a TaskId>>,
    visited: &mut HashSet<&'a TaskId>,
    in_stack: &mut HashSet<&'a TaskId>,
) -> Option<(&'a TaskId, &'a TaskId)> {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(successors) = adj.get(node) {
        for &next in successors {
            if in_stack.contains(next) {
                return Some((node, next));
            }
            if !visited.contains(next) {
                if let Some(edge) = back_edge_dfs(next, adj, visited, in_stack) {
                    return Some(edge);
                }
            }
        }
    }

    in_stack.remove(node);
    None
}
