/// Default number of undo steps kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Bounded undo/redo stacks of whole-state snapshots.
///
/// Pushing a new state clears the redo stack. When the undo stack grows
/// past `limit` its oldest entry is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStack<T> {
    limit: usize,
    undo: Vec<T>,
    redo: Vec<T>,
}

impl<T> HistoryStack<T> {
    /// Empty history keeping at most `limit` undo steps (at least one).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Record `state` as the state before an action.
    pub fn push(&mut self, state: T) {
        self.undo.push(state);
        if self.undo.len() > self.limit {
            self.undo.remove(0);
        }
        self.redo.clear();
    }

    /// Step back: returns the previous state and stores `current` for
    /// redo, or gives `current` back in `Err` when there is nothing to
    /// undo.
    ///
    /// # Errors
    ///
    /// Returns `Err(current)` if the undo stack is empty.
    pub fn undo(&mut self, current: T) -> Result<T, T> {
        let Some(previous) = self.undo.pop() else {
            return Err(current);
        };
        self.redo.push(current);
        Ok(previous)
    }

    /// Step forward again after an [`undo`](Self::undo).
    ///
    /// # Errors
    ///
    /// Returns `Err(current)` if the redo stack is empty.
    pub fn redo(&mut self, current: T) -> Result<T, T> {
        let Some(next) = self.redo.pop() else {
            return Err(current);
        };
        self.undo.push(current);
        Ok(next)
    }

    /// Forget every snapshot.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undo steps available.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Number of redo steps available.
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }
}

impl<T> Default for HistoryStack<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_entries_are_evicted() {
        let mut history = HistoryStack::new(20);
        for i in 0..25 {
            history.push(i);
        }
        assert_eq!(history.undo_len(), 20);
        // Newest last: undo walks back from 24 down to 5.
        let mut current = 100;
        let mut seen = Vec::new();
        while let Ok(previous) = history.undo(current) {
            seen.push(previous);
            current = previous;
        }
        assert_eq!(seen.first(), Some(&24));
        assert_eq!(seen.last(), Some(&5));
        assert_eq!(seen.len(), 20);
    }

    #[test]
    fn undo_then_redo_round_trips() {
        let mut history = HistoryStack::new(5);
        history.push("a");
        let previous = history.undo("b");
        assert_eq!(previous, Ok("a"));
        assert!(history.can_redo());
        assert_eq!(history.redo("a"), Ok("b"));
        assert!(!history.can_redo());
        assert!(history.can_undo());
    }

    #[test]
    fn push_clears_redo() {
        let mut history = HistoryStack::new(5);
        history.push(1);
        assert_eq!(history.undo(2), Ok(1));
        history.push(3);
        assert!(!history.can_redo());
        assert_eq!(history.redo(4), Err(4));
    }

    #[test]
    fn empty_history_returns_current() {
        let mut history: HistoryStack<u8> = HistoryStack::default();
        assert_eq!(history.undo(7), Err(7));
        assert_eq!(history.redo(7), Err(7));
        assert_eq!(history.limit(), DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn clear_empties_both_stacks() {
        let mut history = HistoryStack::new(3);
        history.push(1);
        history.push(2);
        let _ = history.undo(3);
        history.clear();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
