//! Schedule analyses.
//!
//! Each analysis reads a [`ScheduleSnapshot`](crate::models::ScheduleSnapshot)
//! and never modifies it.
//!
//! - [`critical_path`]: CPM forward/backward pass, float, critical set
//! - [`capacity`]: per user-day demand against capacity
//! - [`earned_value`]: PV/EV/AC and derived indices
//! - [`baseline`]: freezing and comparing baselines

pub mod baseline;
pub mod capacity;
pub mod critical_path;
pub mod earned_value;

pub use capacity::{evaluation_window, CapacityEvaluation, UserCapacity};
pub use critical_path::{CriticalPathResult, TaskTiming, DEFAULT_CRITICAL_TOLERANCE_MINUTES};
pub use earned_value::{aggregate_indices, EarnedValueInput};
