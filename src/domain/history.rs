//! Bounded undo/redo over whole-state snapshots.
//!
//! The history owns deep copies: callers hand in the state as it was before
//! a mutation, and later mutations of the live state never reach back into
//! a stored snapshot.

use serde::Serialize;
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryState {
    Empty,
    HasUndo,
    HasRedo,
    HasBoth,
}

#[derive(Debug, Clone)]
pub struct SnapshotHistory<T> {
    undo_stack: VecDeque<T>,
    redo_stack: Vec<T>,
    limit: usize,
}

impl<T> Default for SnapshotHistory<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl<T> SnapshotHistory<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Records the pre-mutation state, evicting the oldest entry past the
    /// limit and discarding everything that could have been redone.
    pub fn push(&mut self, snapshot: T) {
        self.undo_stack.push_back(snapshot);
        self.enforce_limit();
        self.redo_stack.clear();
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn state(&self) -> HistoryState {
        match (self.can_undo(), self.can_redo()) {
            (false, false) => HistoryState::Empty,
            (true, false) => HistoryState::HasUndo,
            (false, true) => HistoryState::HasRedo,
            (true, true) => HistoryState::HasBoth,
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn enforce_limit(&mut self) {
        while self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
        }
    }
}

impl<T: Clone> SnapshotHistory<T> {
    /// Returns the state to restore, parking a copy of `current` for redo.
    pub fn undo(&mut self, current: &T) -> Option<T> {
        let previous = self.undo_stack.pop_back()?;
        self.redo_stack.push(current.clone());
        Some(previous)
    }

    /// Returns the state to restore, parking a copy of `current` for undo.
    pub fn redo(&mut self, current: &T) -> Option<T> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push_back(current.clone());
        self.enforce_limit();
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_history_refuses_undo_and_redo() {
        let mut history = SnapshotHistory::<u32>::default();
        assert_eq!(history.state(), HistoryState::Empty);
        assert_eq!(history.undo(&0), None);
        assert_eq!(history.redo(&0), None);
        assert_eq!(history.state(), HistoryState::Empty);
    }

    #[test]
    fn undo_then_redo_walks_both_stacks() {
        let mut history = SnapshotHistory::default();
        let mut live = 0;
        for next in 1..=3 {
            history.push(live);
            live = next;
        }
        assert_eq!(history.state(), HistoryState::HasUndo);

        live = history.undo(&live).expect("undo");
        assert_eq!(live, 2);
        assert_eq!(history.state(), HistoryState::HasBoth);

        live = history.redo(&live).expect("redo");
        assert_eq!(live, 3);
        assert_eq!(history.state(), HistoryState::HasUndo);
    }

    #[test]
    fn push_clears_redo() {
        let mut history = SnapshotHistory::default();
        history.push(1);
        let _ = history.undo(&2);
        assert!(history.can_redo());
        history.push(5);
        assert!(!history.can_redo());
        assert_eq!(history.state(), HistoryState::HasUndo);
    }

    #[test]
    fn fifty_first_push_drops_the_oldest_entry() {
        let mut history = SnapshotHistory::new(DEFAULT_HISTORY_LIMIT);
        for value in 0..=DEFAULT_HISTORY_LIMIT {
            history.push(value);
        }
        assert_eq!(history.undo_depth(), DEFAULT_HISTORY_LIMIT);

        let mut live = 999;
        let mut restored = Vec::new();
        while let Some(previous) = history.undo(&live) {
            restored.push(previous);
            live = previous;
        }
        assert_eq!(restored.last(), Some(&1));
    }

    #[test]
    fn stored_snapshots_are_independent_copies() {
        let mut history = SnapshotHistory::default();
        let mut live = vec!["a".to_string()];
        history.push(live.clone());
        live.push("b".to_string());
        live[0].push('!');

        let restored = history.undo(&live).expect("undo");
        assert_eq!(restored, vec!["a".to_string()]);
    }

    proptest! {
        #[test]
        fn undo_and_redo_are_inverse(values in proptest::collection::vec(any::<i32>(), 1..50)) {
            let mut history = SnapshotHistory::default();
            let initial = -1i64;
            let mut live = initial;
            for value in &values {
                history.push(live);
                live = i64::from(*value);
            }
            let final_state = live;

            for _ in 0..values.len() {
                live = history.undo(&live).expect("undo available");
            }
            prop_assert_eq!(live, initial);
            prop_assert!(!history.can_undo());

            for _ in 0..values.len() {
                live = history.redo(&live).expect("redo available");
            }
            prop_assert_eq!(live, final_state);
            prop_assert!(!history.can_redo());
        }
    }
}
