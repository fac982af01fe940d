//! Dependency-graph construction: topological sort, cycle detection, and
//! invalid-link filtering over the flat `Task`/`Link` model.
//!
//! The graph is represented as adjacency lists keyed by task ID, never by
//! object reference — this is what lets structural cycles be detected
//! independently of the task tree's `parent` ownership, which is itself a
//! tree and can never cycle.

use std::collections::{HashMap, HashSet, VecDeque};

use flowplan_core::{Link, Task, TaskId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("dependency graph contains a cycle")]
    CycleDetected,
}

fn declaration_index(tasks: &[Task]) -> HashMap<&TaskId, usize> {
    tasks.iter().enumerate().map(|(i, t)| (&t.id, i)).collect()
}

fn adjacency(tasks: &[Task], links: &[Link]) -> (HashMap<TaskId, Vec<TaskId>>, HashMap<TaskId, usize>) {
    let mut successors: HashMap<TaskId, Vec<TaskId>> = tasks.iter().map(|t| (t.id.clone(), Vec::new())).collect();
    let mut in_degree: HashMap<TaskId, usize> = tasks.iter().map(|t| (t.id.clone(), 0)).collect();
    for link in links {
        if let Some(succ) = successors.get_mut(&link.source) {
            succ.push(link.target.clone());
        }
        if let Some(deg) = in_degree.get_mut(&link.target) {
            *deg += 1;
        }
    }
    (successors, in_degree)
}

/// Kahn's algorithm. Ties among simultaneously-ready nodes are broken by
/// declaration order (the order `tasks` appears in the input slice), per
/// spec's ordering guarantee. Returns `GraphError::CycleDetected` if the
/// sort cannot place every task.
pub fn topological_sort(tasks: &[Task], links: &[Link]) -> Result<Vec<TaskId>, GraphError> {
    let (successors, mut in_degree) = adjacency(tasks, links);
    let order = declaration_index(tasks);

    let mut ready: VecDeque<TaskId> = tasks
        .iter()
        .filter(|t| in_degree.get(&t.id).copied().unwrap_or(0) == 0)
        .map(|t| t.id.clone())
        .collect();

    let mut result = Vec::with_capacity(tasks.len());
    while let Some(id) = pop_next_by_declaration_order(&mut ready, &order) {
        result.push(id.clone());
        if let Some(succ) = successors.get(&id) {
            for next in succ {
                if let Some(deg) = in_degree.get_mut(next) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.push_back(next.clone());
                    }
                }
            }
        }
    }

    if result.len() != tasks.len() {
        return Err(GraphError::CycleDetected);
    }
    Ok(result)
}

/// Pop the queued node with the smallest declaration index, preserving
/// Kahn's-algorithm ready-set semantics while keeping output order
/// deterministic and tied to input order rather than queue insertion
/// order.
fn pop_next_by_declaration_order(
    ready: &mut VecDeque<TaskId>,
    order: &HashMap<&TaskId, usize>,
) -> Option<TaskId> {
    let (pos, _) = ready
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| order.get(id).copied().unwrap_or(usize::MAX))?;
    ready.remove(pos)
}

fn children_by_parent(tasks: &[Task]) -> HashMap<TaskId, Vec<TaskId>> {
    let mut map: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for task in tasks {
        if let Some(parent) = &task.parent {
            map.entry(parent.clone()).or_default().push(task.id.clone());
        }
    }
    map
}

fn is_descendant(children: &HashMap<TaskId, Vec<TaskId>>, ancestor: &str, candidate: &str) -> bool {
    let mut stack: Vec<&TaskId> = children.get(ancestor).into_iter().flatten().collect();
    while let Some(id) = stack.pop() {
        if id == candidate {
            return true;
        }
        if let Some(next) = children.get(id) {
            stack.extend(next);
        }
    }
    false
}

/// Partition `links` into `(valid, removed)`. A link is removed if its
/// source or target is unknown, it is a self-link, or its source is a
/// summary task and its target is one of that summary's own descendants.
pub fn remove_invalid_links(tasks: &[Task], links: &[Link]) -> (Vec<Link>, Vec<Link>) {
    let known: HashSet<&TaskId> = tasks.iter().map(|t| &t.id).collect();
    let summaries: HashSet<&TaskId> = tasks
        .iter()
        .filter(|t| t.is_summary())
        .map(|t| &t.id)
        .collect();
    let children = children_by_parent(tasks);

    let mut valid = Vec::new();
    let mut removed = Vec::new();
    for link in links {
        let unknown_endpoint = !known.contains(&link.source) || !known.contains(&link.target);
        let self_link = link.source == link.target;
        let summary_to_own_descendant =
            summaries.contains(&link.source) && is_descendant(&children, &link.source, &link.target);

        if unknown_endpoint || self_link || summary_to_own_descendant {
            removed.push(link.clone());
        } else {
            valid.push(link.clone());
        }
    }
    (valid, removed)
}

/// DFS from every node, tracking the current path, reporting each cycle
/// found as the ID path from the first repeated node back to itself.
/// Returns `[]` iff [`topological_sort`] would succeed.
pub fn detect_circular_dependencies(tasks: &[Task], links: &[Link]) -> Vec<Vec<TaskId>> {
    let (successors, _) = adjacency(tasks, links);
    let mut cycles = Vec::new();
    let mut globally_visited: HashSet<TaskId> = HashSet::new();

    for task in tasks {
        if globally_visited.contains(&task.id) {
            continue;
        }
        let mut path = Vec::new();
        let mut on_path: HashSet<TaskId> = HashSet::new();
        dfs_find_cycle(
            &task.id,
            &successors,
            &mut path,
            &mut on_path,
            &mut globally_visited,
            &mut cycles,
        );
    }
    cycles
}

fn dfs_find_cycle(
    node: &TaskId,
    successors: &HashMap<TaskId, Vec<TaskId>>,
    path: &mut Vec<TaskId>,
    on_path: &mut HashSet<TaskId>,
    globally_visited: &mut HashSet<TaskId>,
    cycles: &mut Vec<Vec<TaskId>>,
) {
    path.push(node.clone());
    on_path.insert(node.clone());

    if let Some(next_nodes) = successors.get(node) {
        for next in next_nodes {
            if on_path.contains(next) {
                let start = path.iter().position(|id| id == next).unwrap_or(0);
                let mut cycle: Vec<TaskId> = path[start..].to_vec();
                cycle.push(next.clone());
                cycles.push(cycle);
            } else if !globally_visited.contains(next) {
                dfs_find_cycle(next, successors, path, on_path, globally_visited, cycles);
            }
        }
    }

    path.pop();
    on_path.remove(node);
    globally_visited.insert(node.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowplan_core::LinkType;
    use pretty_assertions::assert_eq;

    fn task(id: &str) -> Task {
        Task::new(id, id)
    }

    fn link(id: &str, source: &str, target: &str) -> Link {
        Link::new(id, source, target, LinkType::E2s)
    }

    #[test]
    fn topo_sort_orders_chain() {
        let tasks = vec![task("a"), task("b"), task("c")];
        let links = vec![link("l1", "a", "b"), link("l2", "b", "c")];
        let order = topological_sort(&tasks, &links).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn topo_sort_breaks_ties_by_declaration_order() {
        let tasks = vec![task("a"), task("b"), task("c")];
        let order = topological_sort(&tasks, &[]).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn topo_sort_detects_cycle() {
        let tasks = vec![task("a"), task("b")];
        let links = vec![link("l1", "a", "b"), link("l2", "b", "a")];
        assert_eq!(topological_sort(&tasks, &links), Err(GraphError::CycleDetected));
    }

    #[test]
    fn detect_circular_dependencies_matches_topo_sort_success() {
        let tasks = vec![task("a"), task("b"), task("c")];
        let links = vec![link("l1", "a", "b"), link("l2", "b", "c")];
        assert!(detect_circular_dependencies(&tasks, &links).is_empty());
        assert!(topological_sort(&tasks, &links).is_ok());
    }

    #[test]
    fn detect_circular_dependencies_finds_cycle() {
        let tasks = vec![task("a"), task("b"), task("c")];
        let links = vec![link("l1", "a", "b"), link("l2", "b", "c"), link("l3", "c", "a")];
        let cycles = detect_circular_dependencies(&tasks, &links);
        assert_eq!(cycles.len(), 1);
        assert!(topological_sort(&tasks, &links).is_err());
    }

    #[test]
    fn remove_invalid_links_rejects_unknown_endpoints() {
        let tasks = vec![task("a"), task("b")];
        let links = vec![link("l1", "a", "ghost")];
        let (valid, removed) = remove_invalid_links(&tasks, &links);
        assert!(valid.is_empty());
        assert_eq!(removed.len(), 1);
    }

    #[test]
    fn remove_invalid_links_rejects_self_links() {
        let tasks = vec![task("a")];
        let links = vec![link("l1", "a", "a")];
        let (valid, removed) = remove_invalid_links(&tasks, &links);
        assert!(valid.is_empty());
        assert_eq!(removed.len(), 1);
    }

    #[test]
    fn remove_invalid_links_rejects_summary_to_own_descendant() {
        let mut summary = task("p");
        summary.kind = flowplan_core::TaskKind::Summary;
        let child = task("c").parent("p");
        let tasks = vec![summary, child];
        let links = vec![link("l1", "p", "c")];
        let (valid, removed) = remove_invalid_links(&tasks, &links);
        assert!(valid.is_empty());
        assert_eq!(removed.len(), 1);
    }

    #[test]
    fn remove_invalid_links_keeps_valid_links() {
        let tasks = vec![task("a"), task("b")];
        let links = vec![link("l1", "a", "b")];
        let (valid, removed) = remove_invalid_links(&tasks, &links);
        assert_eq!(valid.len(), 1);
        assert!(removed.is_empty());
    }
}
