//! Scenario engine domain models.
//!
//! Provides the data types shared by the loader, the analyses and the
//! scenario engine. Live project data (tasks, dependencies, allocations,
//! capacity, financials) is read-only input; scenario, result, baseline and
//! earned value records are owned by this crate.
//!
//! # Record Ownership
//!
//! | Record | Source | Mutated here |
//! |--------|--------|--------------|
//! | ScheduledTask, Dependency | project store | never |
//! | ResourceAllocation | allocation store | never |
//! | CapacityCalendar | capacity provider | never |
//! | ScenarioPlan, ScenarioAction, ScenarioResult | scenario store | yes |
//! | Baseline, EarnedValueSnapshot | baseline store | active flag only |

mod allocation;
mod baseline;
mod calendar;
mod ids;
mod scenario;
mod snapshot;
mod summary;
mod task;

pub use allocation::{ProjectFinancials, ResourceAllocation};
pub use baseline::{
    Baseline, BaselineCompareResult, BaselineTask, EarnedValueData, EarnedValueSnapshot,
    NewBaseline, TaskVariance, VarianceStatus,
};
pub use calendar::{CapacityAdjustment, CapacityCalendar, DateRange, TeamRoster};
pub use ids::{
    ActionId, AllocationId, BaselineId, EvSnapshotId, PortfolioId, ProjectId, ResultId,
    ScenarioId, TaskId, TeamId, UserId,
};
pub use scenario::{
    ActionPayload, CapacityTarget, NewScenario, ScenarioAction, ScenarioDetails,
    ScenarioLifecycle, ScenarioPlan, ScenarioResult, ScenarioStatus, TaskShift,
};
pub use snapshot::{ScheduleSnapshot, Scope, ScopeType};
pub use summary::{
    ComputeOutcome, ImpactedProject, ScenarioDeltas, ScenarioStateSnapshot,
    ScenarioSummary,
};
pub use task::{Dependency, DependencyType, ScheduledTask, TaskStatus, MINUTES_PER_DAY};
