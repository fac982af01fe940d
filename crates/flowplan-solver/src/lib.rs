//! # flowplan-solver
//!
//! Dependency-graph construction, critical-path method, and the
//! auto-scheduler for the flowplan scheduling engine.
//!
//! - [`dag`] — topological sort, cycle detection, invalid-link filtering.
//! - [`cpm`] — forward/backward critical-path pass, strict and flexible.
//! - [`scheduler`] — calendar- and constraint-aware date propagation.
//!
//! ## Example
//!
//! ```rust
//! use flowplan_core::{Task, Link, LinkType};
//! use flowplan_solver::cpm::{calculate_critical_path, CpmMode};
//!
//! let tasks = vec![Task::new("a", "A").duration(3), Task::new("b", "B").duration(2)];
//! let links = vec![Link::new("l1", "a", "b", LinkType::E2s)];
//! let schedule = calculate_critical_path(&tasks, &links, CpmMode::Strict, Some(0), None).unwrap();
//! assert!(schedule.iter().all(|s| s.is_critical));
//! ```

pub mod cpm;
pub mod dag;
pub mod scheduler;

pub use cpm::{calculate_critical_path, CpmError, CpmMode, CpmSchedule};
pub use dag::{detect_circular_dependencies, remove_invalid_links, topological_sort, GraphError};
pub use scheduler::{
    reschedule_from_task, schedule_tasks, Conflict, ConflictKind, ScheduleResult, SchedulerConfig,
    TaskSchedule,
};
