//! # flowplan-core
//!
//! Domain model for the flowplan scheduling engine: `Task`, `Link`,
//! `Calendar`, and `Constraint`, plus the leaf subsystems that operate on
//! them directly (calendar arithmetic, split-task geometry, summary
//! rollups, undo/redo history).
//!
//! This crate holds no scheduling logic — forward/backward CPM passes and
//! dependency propagation live in `flowplan-solver`, which depends on this
//! crate's types.
//!
//! ## Example
//!
//! ```rust
//! use flowplan_core::{Task, TaskKind};
//!
//! let task = Task::new("design", "Design phase").duration(5);
//! assert_eq!(task.kind, TaskKind::Task);
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub mod calendar;
pub mod split;
pub mod summary;
pub mod undo;

pub use calendar::Calendar;

/// Unique identifier for a task.
pub type TaskId = String;

/// Unique identifier for a link.
pub type LinkId = String;

// ============================================================================
// Task
// ============================================================================

/// The closed set of task kinds.
///
/// A task's kind is not a fixed classification: it is auto-derived from
/// whether the task has children (§4.4 `shouldConvertToSummary` /
/// `shouldConvertToTask`), so every component that switches on it must do
/// so exhaustively rather than modelling kind via subclassing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Task,
    Milestone,
    Summary,
}

/// A schedulable work item.
///
/// `start`/`end` form an inclusive day-precision interval: `[start, end]`.
/// A milestone has only `start` and no `end`. A summary's `start`/`end`/
/// `progress` are derived from its children (see [`summary`]) and must not
/// be treated as authoritative inputs once the task has children.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Duration in workdays if a calendar is active, else calendar days.
    /// Authoritative only when `start`/`end` are absent; the scheduler
    /// derives whichever pair is missing.
    pub duration: Option<i64>,
    /// Completion ratio in `[0, 1]`.
    pub progress: f64,
    pub kind: TaskKind,
    pub parent: Option<TaskId>,
    pub base_start: Option<NaiveDate>,
    pub base_end: Option<NaiveDate>,
    pub base_duration: Option<i64>,
    /// Non-empty (length >= 2) iff the task is split; see [`split`].
    pub split_parts: Vec<split::SplitPart>,
    /// Opaque passthrough attributes (assignees, labels, external ids, ...).
    pub attributes: HashMap<String, String>,
}

impl Task {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            start: None,
            end: None,
            duration: None,
            progress: 0.0,
            kind: TaskKind::Task,
            parent: None,
            base_start: None,
            base_end: None,
            base_duration: None,
            split_parts: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    pub fn start(mut self, date: NaiveDate) -> Self {
        self.start = Some(date);
        self
    }

    pub fn end(mut self, date: NaiveDate) -> Self {
        self.end = Some(date);
        self
    }

    pub fn duration(mut self, days: i64) -> Self {
        self.duration = Some(days);
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = progress.clamp(0.0, 1.0);
        self
    }

    pub fn parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent = Some(parent_id.into());
        self
    }

    pub fn milestone(mut self) -> Self {
        self.kind = TaskKind::Milestone;
        self.end = None;
        self.duration = None;
        self
    }

    pub fn is_milestone(&self) -> bool {
        self.kind == TaskKind::Milestone
    }

    pub fn is_summary(&self) -> bool {
        self.kind == TaskKind::Summary
    }

    /// The task's effective duration in days, preferring an explicit
    /// `duration`, falling back to the `start`/`end` span, defaulting to 1
    /// day per spec.md §4.5 ("Task duration defaults to 1 if neither
    /// `duration` nor `(start,end)` are present").
    pub fn effective_duration_days(&self) -> i64 {
        if let Some(d) = self.duration {
            return d.max(1);
        }
        if let (Some(s), Some(e)) = (self.start, self.end) {
            return ((e - s).num_days() + 1).max(1);
        }
        1
    }
}

// ============================================================================
// Link
// ============================================================================

/// Typed directed dependency between two tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Finish-to-start: successor starts after predecessor finishes.
    E2s,
    /// Start-to-start: successor starts when predecessor starts.
    S2s,
    /// Finish-to-finish: successor finishes when predecessor finishes.
    E2e,
    /// Start-to-finish: successor finishes when predecessor starts.
    S2e,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub source: TaskId,
    pub target: TaskId,
    #[serde(rename = "type")]
    pub kind: LinkType,
    /// Lag in days; negative is lead time. Defaults to 0 when absent.
    pub lag: Option<i64>,
}

impl Link {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        kind: LinkType,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind,
            lag: None,
        }
    }

    pub fn lag(mut self, lag: i64) -> Self {
        self.lag = Some(lag);
        self
    }

    pub fn lag_days(&self) -> i64 {
        self.lag.unwrap_or(0)
    }
}

// ============================================================================
// Constraint
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    StartNoEarlierThan,
    StartNoLaterThan,
    FinishNoEarlierThan,
    FinishNoLaterThan,
    MustStartOn,
    MustFinishOn,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(rename = "type")]
    pub kind: ConstraintType,
    pub date: NaiveDate,
}

impl Constraint {
    pub fn new(kind: ConstraintType, date: NaiveDate) -> Self {
        Self { kind, date }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowplanError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("link not found: {0}")]
    LinkNotFound(LinkId),

    #[error("invalid split: {0}")]
    InvalidSplit(String),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}
