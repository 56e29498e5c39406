//! What-if scenario simulation for project schedules.
//!
//! Loads a project or portfolio schedule, applies hypothetical actions
//! (shifting projects or tasks, changing capacity or budget) to an isolated
//! copy and reports how the critical path, resource load and earned value
//! move between the two states. Baselines freeze a schedule for later
//! variance checks.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `ScheduledTask`, `Dependency`,
//!   `ResourceAllocation`, `ScheduleSnapshot`, `ScenarioPlan`, `Baseline`
//! - **`validation`**: Input integrity checks (duplicate IDs, dangling edges, cycles)
//! - **`graph`**: Index-based dependency graph and topological order
//! - **`analysis`**: Critical path, capacity, earned value, baseline comparison
//! - **`actions`**: Action payload validation and application
//! - **`loader`**: Scope resolution and snapshot loading
//! - **`engine`**: [`ScenarioEngine`], the public entry point
//! - **`store`**: Store traits and the in-memory implementation
//!
//! # References
//!
//! - Kelley & Walker (1959), "Critical-Path Planning and Scheduling"
//! - PMI (2019), "The Standard for Earned Value Management"

pub mod actions;
pub mod analysis;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod loader;
pub mod models;
pub mod store;
pub mod validation;

pub use config::EngineConfig;
pub use engine::ScenarioEngine;
pub use error::{ScenarioError, ScenarioWarning, StoreError};
