//! Bounded, reversible undo/redo history over task/link mutations.
//!
//! History is immutable: every operation takes a `History` by value and
//! returns a new one. The host owns the `History` value and threads it
//! in/out of each mutation — there is no process-wide undo stack.

use serde::{Deserialize, Serialize};

use crate::{Link, Task};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Task,
    Link,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Add,
    Update,
    Delete,
}

/// A snapshot of either a task or a link, used as the `before`/`after`
/// payload of a [`ChangeEntry`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntitySnapshot {
    Task(Task),
    Link(Link),
}

impl EntitySnapshot {
    fn label(&self) -> (&str, &str) {
        match self {
            EntitySnapshot::Task(t) => ("Task", t.text.as_str()),
            EntitySnapshot::Link(l) => ("Link", l.id.as_str()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub entity_type: EntityType,
    pub action: ActionType,
    pub before: Option<EntitySnapshot>,
    pub after: Option<EntitySnapshot>,
    pub timestamp: i64,
}

impl ChangeEntry {
    /// Build the reversed form of this entry: add <-> delete swap, update
    /// keeps its action but swaps `before`/`after`.
    fn reversed(&self) -> Self {
        let action = match self.action {
            ActionType::Add => ActionType::Delete,
            ActionType::Delete => ActionType::Add,
            ActionType::Update => ActionType::Update,
        };
        Self {
            entity_type: self.entity_type,
            action,
            before: self.after.clone(),
            after: self.before.clone(),
            timestamp: self.timestamp,
        }
    }

    fn description(&self) -> String {
        let snapshot = self.after.as_ref().or(self.before.as_ref());
        let (kind, label) = snapshot.map(EntitySnapshot::label).unwrap_or(("Entity", "?"));
        let verb = match self.action {
            ActionType::Add => "added",
            ActionType::Delete => "deleted",
            ActionType::Update => "modified",
        };
        format!("{kind} \"{label}\" {verb}")
    }
}

/// Bounded two-stack undo/redo history.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct History {
    past: Vec<ChangeEntry>,
    future: Vec<ChangeEntry>,
    max_history: usize,
}

impl History {
    pub fn new(max_history: usize) -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            max_history,
        }
    }

    /// Append `entry` to `past`, trimming the oldest entry when over
    /// `max_history`, and clear `future` (a new change invalidates any
    /// previously undone redo chain).
    pub fn record_change(&self, entry: ChangeEntry) -> Self {
        let mut past = self.past.clone();
        past.push(entry);
        if self.max_history > 0 {
            while past.len() > self.max_history {
                past.remove(0);
            }
        }
        Self {
            past,
            future: Vec::new(),
            max_history: self.max_history,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Pop the last `past` entry, push its reversed form onto `future`,
    /// and return `(new_history, original_entry)` so the caller can apply
    /// the inverse mutation. `None` if there is nothing to undo.
    pub fn undo(&self) -> Option<(Self, ChangeEntry)> {
        let mut past = self.past.clone();
        let entry = past.pop()?;
        let mut future = self.future.clone();
        future.push(entry.reversed());
        Some((
            Self {
                past,
                future,
                max_history: self.max_history,
            },
            entry,
        ))
    }

    /// Symmetric to [`History::undo`].
    pub fn redo(&self) -> Option<(Self, ChangeEntry)> {
        let mut future = self.future.clone();
        let entry = future.pop()?;
        let mut past = self.past.clone();
        past.push(entry.reversed());
        Some((
            Self {
                past,
                future,
                max_history: self.max_history,
            },
            entry,
        ))
    }

    pub fn get_undo_description(&self) -> Option<String> {
        self.past.last().map(ChangeEntry::description)
    }

    pub fn get_redo_description(&self) -> Option<String> {
        self.future.last().map(ChangeEntry::description)
    }
}

/// Coalesce a batch of entries into one, using the first entry's `before`
/// and the last entry's `after` — used for drags that otherwise produce
/// many micro-updates.
pub fn group_changes(entries: &[ChangeEntry]) -> Option<ChangeEntry> {
    let first = entries.first()?;
    let last = entries.last()?;
    Some(ChangeEntry {
        entity_type: first.entity_type,
        action: ActionType::Update,
        before: first.before.clone(),
        after: last.after.clone(),
        timestamp: last.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Task;
    use pretty_assertions::assert_eq;

    fn snapshot(text: &str) -> EntitySnapshot {
        EntitySnapshot::Task(Task::new("t1", text))
    }

    fn add_entry(text: &str, ts: i64) -> ChangeEntry {
        ChangeEntry {
            entity_type: EntityType::Task,
            action: ActionType::Add,
            before: None,
            after: Some(snapshot(text)),
            timestamp: ts,
        }
    }

    #[test]
    fn record_change_trims_past_over_max_history() {
        let mut history = History::new(2);
        history = history.record_change(add_entry("a", 1));
        history = history.record_change(add_entry("b", 2));
        history = history.record_change(add_entry("c", 3));
        assert_eq!(history.past.len(), 2);
        assert_eq!(history.past[0].timestamp, 2);
    }

    #[test]
    fn record_change_clears_future() {
        let history = History::new(10).record_change(add_entry("a", 1));
        let (history, _) = history.undo().unwrap();
        assert!(history.can_redo());
        let history = history.record_change(add_entry("b", 2));
        assert!(!history.can_redo());
    }

    #[test]
    fn undo_then_redo_is_identity_on_state_shape() {
        let history = History::new(10).record_change(add_entry("a", 1));
        let (undone, original) = history.undo().unwrap();
        assert_eq!(original.action, ActionType::Add);
        assert!(!undone.can_undo());
        assert!(undone.can_redo());

        let (redone, replayed) = undone.redo().unwrap();
        assert_eq!(replayed.action, ActionType::Add);
        assert!(redone.can_undo());
        assert!(!redone.can_redo());
    }

    #[test]
    fn undo_on_empty_history_returns_none() {
        let history = History::new(10);
        assert!(history.undo().is_none());
    }

    #[test]
    fn reversed_entry_swaps_add_and_delete() {
        let entry = add_entry("a", 1);
        let reversed = entry.reversed();
        assert_eq!(reversed.action, ActionType::Delete);
        assert_eq!(reversed.before, entry.after);
        assert_eq!(reversed.after, entry.before);
    }

    #[test]
    fn update_description_is_human_readable() {
        let entry = ChangeEntry {
            entity_type: EntityType::Task,
            action: ActionType::Update,
            before: Some(snapshot("Old")),
            after: Some(snapshot("New")),
            timestamp: 1,
        };
        let history = History::new(10).record_change(entry);
        assert_eq!(history.get_undo_description().unwrap(), "Task \"New\" modified");
    }

    #[test]
    fn group_changes_uses_first_before_and_last_after() {
        let e1 = ChangeEntry {
            entity_type: EntityType::Task,
            action: ActionType::Update,
            before: Some(snapshot("start")),
            after: Some(snapshot("mid")),
            timestamp: 1,
        };
        let e2 = ChangeEntry {
            entity_type: EntityType::Task,
            action: ActionType::Update,
            before: Some(snapshot("mid")),
            after: Some(snapshot("end")),
            timestamp: 2,
        };
        let grouped = group_changes(&[e1, e2]).unwrap();
        assert_eq!(grouped.timestamp, 2);
        match (&grouped.before, &grouped.after) {
            (Some(EntitySnapshot::Task(b)), Some(EntitySnapshot::Task(a))) => {
                assert_eq!(b.text, "start");
                assert_eq!(a.text, "end");
            }
            _ => panic!("expected task snapshots"),
        }
    }
}
