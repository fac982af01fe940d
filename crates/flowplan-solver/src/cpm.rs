//! Critical-path method: forward/backward pass over the dependency graph,
//! in both strict and flexible modes.
//!
//! Times here are relative day offsets (`i64`), not calendar dates — the
//! critical path is a structural property of durations and link lags, so
//! it is computed independent of any calendar. [`crate::scheduler`] is
//! the component that anchors a schedule to real dates and snaps them to
//! workdays; a `task.start` set on the domain `Task` is not consulted
//! here.

use std::collections::{HashMap, HashSet};

use flowplan_core::{Link, LinkType, Task, TaskId};
use thiserror::Error;
use tracing::debug;

use crate::dag::{topological_sort, GraphError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CpmError {
    #[error("dependency graph contains a cycle")]
    CycleDetected,
    #[error("no tasks to schedule")]
    EmptyGraph,
}

impl From<GraphError> for CpmError {
    fn from(_: GraphError) -> Self {
        CpmError::CycleDetected
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CpmMode {
    Strict,
    Flexible,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CpmSchedule {
    pub task_id: TaskId,
    pub early_start: i64,
    pub early_finish: i64,
    pub late_start: i64,
    pub late_finish: i64,
    pub total_slack: i64,
    pub is_critical: bool,
    pub duration: i64,
}

fn predecessor_links<'a, 'b>(links: &'a [Link], target: &'b TaskId) -> impl Iterator<Item = &'a Link> + use<'a, 'b> {
    links.iter().filter(move |l| &l.target == target)
}

fn successor_links<'a, 'b>(links: &'a [Link], source: &'b TaskId) -> impl Iterator<Item = &'a Link> + use<'a, 'b> {
    links.iter().filter(move |l| &l.source == source)
}

/// Earliest time the successor of this link may start, given the
/// predecessor's computed early start/finish.
fn successor_earliest_start(link: &Link, pred_early_start: i64, pred_early_finish: i64) -> i64 {
    let lag = link.lag_days();
    match link.kind {
        LinkType::E2s | LinkType::E2e => pred_early_finish + lag,
        LinkType::S2s | LinkType::S2e => pred_early_start + lag,
    }
}

/// Latest time the predecessor of this link may finish, given the
/// successor's computed late start/finish.
fn predecessor_latest_finish(link: &Link, succ_late_start: i64, succ_late_finish: i64) -> i64 {
    let lag = link.lag_days();
    match link.kind {
        LinkType::E2s | LinkType::S2s => succ_late_start - lag,
        LinkType::E2e | LinkType::S2e => succ_late_finish - lag,
    }
}

/// Forward/backward CPM pass. `project_start` defaults to 0; if the
/// computed project end is smaller than a caller-supplied `project_end`,
/// the larger of the two is used as the backward pass's anchor.
pub fn calculate_critical_path(
    tasks: &[Task],
    links: &[Link],
    mode: CpmMode,
    project_start: Option<i64>,
    project_end: Option<i64>,
) -> Result<Vec<CpmSchedule>, CpmError> {
    if tasks.is_empty() {
        return Err(CpmError::EmptyGraph);
    }
    debug!(task_count = tasks.len(), ?mode, "calculate_critical_path");
    let order = topological_sort(tasks, links)?;
    let project_start = project_start.unwrap_or(0);

    let duration_of: HashMap<&TaskId, i64> =
        tasks.iter().map(|t| (&t.id, t.effective_duration_days())).collect();

    // Forward pass.
    let mut early_start: HashMap<TaskId, i64> = HashMap::new();
    let mut early_finish: HashMap<TaskId, i64> = HashMap::new();
    for id in &order {
        let duration = *duration_of.get(id).unwrap_or(&1);
        let preds: Vec<&Link> = predecessor_links(links, id).collect();
        let es = if preds.is_empty() {
            project_start
        } else {
            preds
                .iter()
                .map(|l| {
                    let pred_es = *early_start.get(&l.source).unwrap_or(&project_start);
                    let pred_ef = *early_finish.get(&l.source).unwrap_or(&project_start);
                    successor_earliest_start(l, pred_es, pred_ef)
                })
                .max()
                .unwrap_or(project_start)
        };
        early_start.insert(id.clone(), es);
        early_finish.insert(id.clone(), es + duration);
    }

    let computed_end = early_finish.values().copied().max().unwrap_or(project_start);
    let project_end = project_end.map_or(computed_end, |e| e.max(computed_end));

    // Backward pass, reverse topo order.
    let mut late_start: HashMap<TaskId, i64> = HashMap::new();
    let mut late_finish: HashMap<TaskId, i64> = HashMap::new();
    for id in order.iter().rev() {
        let duration = *duration_of.get(id).unwrap_or(&1);
        let succs: Vec<&Link> = successor_links(links, id).collect();
        let lf = if succs.is_empty() {
            project_end
        } else {
            succs
                .iter()
                .map(|l| {
                    let succ_ls = *late_start.get(&l.target).unwrap_or(&project_end);
                    let succ_lf = *late_finish.get(&l.target).unwrap_or(&project_end);
                    predecessor_latest_finish(l, succ_ls, succ_lf)
                })
                .min()
                .unwrap_or(project_end)
        };
        late_finish.insert(id.clone(), lf);
        late_start.insert(id.clone(), lf - duration);
    }

    let mut schedules: Vec<CpmSchedule> = order
        .iter()
        .map(|id| {
            let es = early_start[id];
            let ef = early_finish[id];
            let ls = late_start[id];
            let lf = late_finish[id];
            CpmSchedule {
                task_id: id.clone(),
                early_start: es,
                early_finish: ef,
                late_start: ls,
                late_finish: lf,
                total_slack: ls - es,
                is_critical: ls - es == 0,
                duration: duration_of[id],
            }
        })
        .collect();

    if mode == CpmMode::Flexible {
        apply_flexible_tracing(&mut schedules, &order, links);
    }

    Ok(schedules)
}

/// Trace a single greedy min-slack chain from each source-less task,
/// descending to the successor with minimum slack at each step (ties
/// broken by declaration order in `order`). Only chain members are
/// critical; everything else is demoted regardless of zero-slack status.
fn apply_flexible_tracing(schedules: &mut [CpmSchedule], order: &[TaskId], links: &[Link]) {
    let slack_of: HashMap<TaskId, i64> = schedules.iter().map(|s| (s.task_id.clone(), s.total_slack)).collect();
    let has_predecessor: HashSet<TaskId> = links.iter().map(|l| l.target.clone()).collect();

    let mut successors: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for link in links {
        successors.entry(link.source.clone()).or_default().push(link.target.clone());
    }
    // Preserve declaration order of targets within each source's successor list.
    for targets in successors.values_mut() {
        targets.sort_by_key(|id| order.iter().position(|o| o == id).unwrap_or(usize::MAX));
    }

    let sources: Vec<TaskId> = order.iter().filter(|id| !has_predecessor.contains(*id)).cloned().collect();

    let mut critical: HashSet<TaskId> = HashSet::new();
    for source in sources {
        let mut visited: HashSet<TaskId> = HashSet::new();
        let mut current = source;
        loop {
            if visited.contains(&current) {
                break;
            }
            critical.insert(current.clone());
            visited.insert(current.clone());

            let next = successors
                .get(&current)
                .into_iter()
                .flatten()
                .min_by_key(|id| slack_of.get(*id).copied().unwrap_or(i64::MAX))
                .cloned();

            match next {
                Some(n) => current = n,
                None => break,
            }
        }
    }

    for schedule in schedules.iter_mut() {
        schedule.is_critical = critical.contains(&schedule.task_id);
    }
}
