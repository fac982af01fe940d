//! Summary (rollup) semantics: derived progress and date range for tasks
//! with children.
//!
//! A summary's `progress`/`start`/`end` are never authoritative inputs —
//! they are recomputed from descendants every time a child changes. Kind
//! auto-coercion (`task` <-> `summary`) happens alongside the same
//! recompute, since whether a task has children is exactly what decides
//! both things.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::{Task, TaskId, TaskKind};

/// Workday-weighted average progress over non-milestone children:
/// `Σ(duration_i · progress_i) / Σ duration_i`, rounded to 2 decimals.
/// Milestones and zero-duration children contribute nothing to either
/// side of the ratio. An all-zero-weight set (e.g. only milestone
/// children) yields 0.0 rather than NaN.
///
/// A child's weight is `effective_duration_days()`, which for a nested
/// summary is the sum of *its* descendant leaf durations rather than its
/// calendar-day span — see [`apply_summary_rollup`], which sets a
/// summary's `duration` to exactly that sum on every recompute.
pub fn calculate_weighted_progress(children: &[&Task]) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for child in children {
        if child.is_milestone() {
            continue;
        }
        let duration = child.effective_duration_days() as f64;
        weighted_sum += duration * child.progress;
        weight_total += duration;
    }
    if weight_total <= 0.0 {
        return 0.0;
    }
    let ratio = weighted_sum / weight_total;
    (ratio * 100.0).round() / 100.0
}

/// Derived `start`/`end` as the min/max over children's dates, including
/// a milestone's single `start` as both endpoints of its own span. `None`
/// if no child has a datable start.
pub fn derive_date_range(children: &[&Task]) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let mut min_start: Option<NaiveDate> = None;
    let mut max_end: Option<NaiveDate> = None;

    for child in children {
        let (child_start, child_end) = if child.is_milestone() {
            (child.start, child.start)
        } else {
            (child.start, child.end.or(child.start))
        };
        if let Some(s) = child_start {
            min_start = Some(min_start.map_or(s, |current| current.min(s)));
        }
        if let Some(e) = child_end {
            max_end = Some(max_end.map_or(e, |current| current.max(e)));
        }
    }

    (min_start, max_end)
}

/// `true` iff a task with no children gains its first one and should
/// auto-convert to `summary`.
pub fn should_convert_to_summary(kind: TaskKind, has_children: bool) -> bool {
    has_children && kind != TaskKind::Summary
}

/// `true` iff a `summary` task loses its last child and should revert to
/// a plain `task`.
pub fn should_convert_to_task(kind: TaskKind, has_children: bool) -> bool {
    !has_children && kind == TaskKind::Summary
}

/// Recompute `task`'s kind/progress/start/end from `children` in place.
/// Milestones are left untouched — a milestone never becomes a summary
/// even if (irregularly) given children.
pub fn apply_summary_rollup(task: &mut Task, children: &[&Task]) {
    if task.is_milestone() {
        return;
    }
    let has_children = !children.is_empty();
    if should_convert_to_summary(task.kind, has_children) {
        task.kind = TaskKind::Summary;
    } else if should_convert_to_task(task.kind, has_children) {
        task.kind = TaskKind::Task;
    }

    if task.kind != TaskKind::Summary {
        return;
    }

    task.progress = calculate_weighted_progress(children);
    let (start, end) = derive_date_range(children);
    task.start = start;
    task.end = end;
    task.duration = Some(sum_leaf_durations(children));
}

/// Total leaf-duration weight of `children`: milestones contribute
/// nothing (matching [`calculate_weighted_progress`]'s weighting), a
/// plain task contributes its own `effective_duration_days()`, and a
/// nested summary contributes the same — which, by the time its parent
/// is recomputed, is already the sum of *its* descendant leaves rather
/// than its calendar span, since [`propagate_summary_chain`] recomputes
/// bottom-up.
fn sum_leaf_durations(children: &[&Task]) -> i64 {
    children
        .iter()
        .filter(|child| !child.is_milestone())
        .map(|child| child.effective_duration_days())
        .sum()
}

/// Walk the parent chain from `changed_id` upward, recomputing each
/// ancestor summary's rollup from its direct children. Stops at the first
/// task with no parent. These updates are derived facts, not user
/// actions — callers should record them with `skip_undo = true`.
pub fn propagate_summary_chain(tasks: &mut HashMap<TaskId, Task>, changed_id: &TaskId) {
    let Some(mut current_parent) = tasks.get(changed_id).and_then(|t| t.parent.clone()) else {
        return;
    };

    loop {
        let child_ids: Vec<TaskId> = tasks
            .values()
            .filter(|t| t.parent.as_deref() == Some(current_parent.as_str()))
            .map(|t| t.id.clone())
            .collect();
        let children: Vec<Task> = child_ids.iter().filter_map(|id| tasks.get(id).cloned()).collect();
        let child_refs: Vec<&Task> = children.iter().collect();

        let Some(parent_task) = tasks.get_mut(&current_parent) else {
            return;
        };
        apply_summary_rollup(parent_task, &child_refs);

        match parent_task.parent.clone() {
            Some(next) => current_parent = next,
            None => return,
        }
    }
}
