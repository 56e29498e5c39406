//! Task dependency graph.
//!
//! Nodes are positions in the snapshot's (id-sorted) task list, so the
//! graph holds plain indices instead of references between tasks. Edges
//! carry the dependency type and lag converted to minutes.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::error::ScenarioError;
use crate::models::{DependencyType, ScheduleSnapshot, ScheduledTask, TaskId};
use crate::validation::find_cycle_edge;

/// One adjacency entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Index of the task at the other end.
    pub node: usize,
    pub dependency_type: DependencyType,
    pub lag_minutes: i64,
}

/// Adjacency-list view of a snapshot's dependencies.
#[derive(Debug)]
pub struct ScheduleGraph<'a> {
    snapshot: &'a ScheduleSnapshot,
    index: HashMap<&'a TaskId, usize>,
    successors: Vec<Vec<Edge>>,
    predecessors: Vec<Vec<Edge>>,
}

impl<'a> ScheduleGraph<'a> {
    /// Indexes the snapshot.
    ///
    /// Fails with `InvalidSchedule` if a dependency names a task that is not
    /// in the snapshot.
    pub fn build(snapshot: &'a ScheduleSnapshot) -> Result<Self, ScenarioError> {
        let n = snapshot.tasks.len();
        let index: HashMap<&TaskId, usize> = snapshot
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (&t.id, i))
            .collect();

        let mut successors = vec![Vec::new(); n];
        let mut predecessors = vec![Vec::new(); n];

        for dep in snapshot.dependencies.iter() {
            let (Some(&from), Some(&to)) = (
                index.get(&dep.predecessor_id),
                index.get(&dep.successor_id),
            ) else {
                return Err(ScenarioError::InvalidSchedule(format!(
                    "Dependency {} -> {} references a task outside the snapshot",
                    dep.predecessor_id, dep.successor_id
                )));
            };
            let lag_minutes = dep.lag_minutes();
            successors[from].push(Edge {
                node: to,
                dependency_type: dep.dependency_type,
                lag_minutes,
            });
            predecessors[to].push(Edge {
                node: from,
                dependency_type: dep.dependency_type,
                lag_minutes,
            });
        }

        Ok(Self {
            snapshot,
            index,
            successors,
            predecessors,
        })
    }

    pub fn node_count(&self) -> usize {
        self.snapshot.tasks.len()
    }

    pub fn task(&self, node: usize) -> &'a ScheduledTask {
        self.snapshot.tasks[node].as_ref()
    }

    pub fn index_of(&self, task_id: &TaskId) -> Option<usize> {
        self.index.get(task_id).copied()
    }

    pub fn successors(&self, node: usize) -> &[Edge] {
        &self.successors[node]
    }

    pub fn predecessors(&self, node: usize) -> &[Edge] {
        &self.predecessors[node]
    }

    /// Topological order of all nodes.
    ///
    /// # Algorithm
    /// Kahn's algorithm with a min-heap, so ready tasks are released in id
    /// order and the result is deterministic.
    ///
    /// # Errors
    /// `CyclicDependency` naming one edge of a cycle.
    pub fn topological_order(&self) -> Result<Vec<usize>, ScenarioError> {
        let n = self.node_count();
        let mut in_degree: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            for edge in &self.successors[node] {
                in_degree[edge.node] -= 1;
                if in_degree[edge.node] == 0 {
                    ready.push(Reverse(edge.node));
                }
            }
        }

        if order.len() == n {
            return Ok(order);
        }

        let (predecessor, successor) = find_cycle_edge(self.snapshot).unwrap_or_else(|| {
            // Kahn stalled, so a cycle exists; fall back to any stuck node.
            let stuck = in_degree.iter().position(|&d| d > 0).unwrap_or(0);
            let from = self.predecessors[stuck].first().map_or(stuck, |e| e.node);
            (self.task(from).id.clone(), self.task(stuck).id.clone())
        });
        Err(ScenarioError::CyclicDependency {
            predecessor,
            successor,
        })
    }
}
