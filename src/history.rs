//! Bounded undo/redo over whole parameter snapshots.

use std::collections::VecDeque;

use crate::config::HISTORY_DEPTH;

#[derive(Debug, Clone)]
pub struct ParameterHistory<T> {
    undo_stack: VecDeque<T>,
    redo_stack: Vec<T>,
    max_depth: usize,
}

impl<T: Clone + PartialEq> Default for ParameterHistory<T> {
    fn default() -> Self {
        Self::new(HISTORY_DEPTH)
    }
}

impl<T: Clone + PartialEq> ParameterHistory<T> {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Save `state` as the point the next undo returns to.
    ///
    /// A state equal to the newest entry is not stored twice. Any push
    /// invalidates the redo stack.
    pub fn push(&mut self, state: T) {
        if self.undo_stack.back() == Some(&state) {
            return;
        }
        self.undo_stack.push_back(state);
        self.redo_stack.clear();

        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    /// Step back, parking `current` on the redo stack
    pub fn undo(&mut self, current: T) -> Option<T> {
        let state = self.undo_stack.pop_back()?;
        self.redo_stack.push(current);
        Some(state)
    }

    /// Step forward, parking `current` on the undo stack
    pub fn redo(&mut self, current: T) -> Option<T> {
        let state = self.redo_stack.pop()?;
        self.undo_stack.push_back(current);
        Some(state)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{BodyKey, BodyParameters};

    fn with_leg(length: f32) -> BodyParameters {
        let mut params = BodyParameters::default();
        params.set_body(BodyKey::LegLength, length);
        params
    }

    #[test]
    fn test_undo_after_three_pushes() {
        let mut history = ParameterHistory::default();
        history.push(with_leg(1.0));
        history.push(with_leg(1.1));
        history.push(with_leg(1.2));
        let current = with_leg(1.3);

        let previous = history.undo(current.clone()).unwrap();
        assert_eq!(previous, with_leg(1.2));
        assert!(history.can_undo());
        assert!(history.can_redo());

        let restored = history.redo(previous).unwrap();
        assert_eq!(restored, current);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_push_after_undo_clears_redo() {
        let mut history = ParameterHistory::default();
        history.push(with_leg(1.0));
        history.push(with_leg(1.1));
        history.undo(with_leg(1.2)).unwrap();
        assert!(history.can_redo());

        history.push(with_leg(0.9));
        assert!(!history.can_redo());
        assert!(history.redo(with_leg(0.8)).is_none());
    }

    #[test]
    fn test_duplicate_top_skipped() {
        let mut history = ParameterHistory::default();
        history.push(with_leg(1.0));
        history.push(with_leg(1.0));
        history.undo(with_leg(1.5)).unwrap();
        assert!(!history.can_undo());
    }

    #[test]
    fn test_depth_bound_drops_oldest() {
        let mut history = ParameterHistory::new(3);
        for i in 0..5 {
            history.push(i);
        }
        let mut seen = Vec::new();
        let mut current = 5;
        while let Some(state) = history.undo(current) {
            seen.push(state);
            current = state;
        }
        assert_eq!(seen, vec![4, 3, 2]);
    }

    #[test]
    fn test_empty_history() {
        let mut history: ParameterHistory<u32> = ParameterHistory::default();
        assert!(history.undo(1).is_none());
        assert!(history.redo(1).is_none());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
