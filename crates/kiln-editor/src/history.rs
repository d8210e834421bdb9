//! Undo/redo action log.
//!
//! Every mutating edit is recorded as one [`UndoAction`] holding enough to
//! rebuild both directions:
//!
//! - `Insert { text, position }`: undo deletes the span and puts the cursor
//!   at `position`; redo inserts again and puts the cursor after the text.
//! - `Delete { text, start, end }`: undo re-inserts at `start` and puts the
//!   cursor after the re-inserted span; redo deletes again and puts the
//!   cursor at `start`.
//!
//! Recording a new action clears the redo sequence. History is unbounded
//! unless a limit is configured, in which case the oldest action falls off.

use std::collections::VecDeque;

use crate::buffer::{TextBuffer, end_after_insert};
use crate::cursor::CursorSelectionModel;
use crate::error::Result;
use crate::position::Position;

// ---------------------------------------------------------------------------
// UndoAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoAction {
    Insert { text: String, position: Position },
    Delete { text: String, start: Position, end: Position },
}

impl UndoAction {
    /// Reverse the action's effect on `buf` and return where the cursor goes.
    fn revert(&self, buf: &mut TextBuffer) -> Result<Position> {
        match self {
            Self::Insert { text, position } => {
                buf.delete_range(*position, end_after_insert(*position, text))?;
                Ok(*position)
            }
            Self::Delete { text, start, .. } => buf.insert_text(*start, text),
        }
    }

    /// Re-apply the action on `buf` and return where the cursor goes.
    fn apply(&self, buf: &mut TextBuffer) -> Result<Position> {
        match self {
            Self::Insert { text, position } => buf.insert_text(*position, text),
            Self::Delete { start, end, .. } => {
                buf.delete_range(*start, *end)?;
                Ok(*start)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// UndoRedoLog
// ---------------------------------------------------------------------------

/// Which way a history step went. Returned so the caller can word its
/// status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Applied,
    /// The respective sequence was empty; nothing changed.
    Empty,
}

#[derive(Debug, Clone, Default)]
pub struct UndoRedoLog {
    history: VecDeque<UndoAction>,
    redo: Vec<UndoAction>,
    limit: Option<usize>,
}

impl UndoRedoLog {
    /// An unbounded log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A log keeping at most `limit` actions (`None` = unbounded).
    #[must_use]
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit: limit.filter(|&n| n > 0),
            ..Self::default()
        }
    }

    /// Append a user edit and forget everything that could be redone.
    pub fn record(&mut self, action: UndoAction) {
        self.history.push_back(action);
        if let Some(limit) = self.limit {
            while self.history.len() > limit {
                self.history.pop_front();
            }
        }
        self.redo.clear();
    }

    /// Undo the latest action, moving the cursor per the action kind and
    /// clearing any selection.
    ///
    /// # Errors
    ///
    /// Propagates a buffer error if the recorded positions no longer fit the
    /// buffer; the action is kept in the history in that case.
    pub fn undo(&mut self, buf: &mut TextBuffer, cursor: &mut CursorSelectionModel) -> Result<Step> {
        let Some(action) = self.history.pop_back() else {
            return Ok(Step::Empty);
        };
        match action.revert(buf) {
            Ok(pos) => {
                cursor.clear_selection();
                cursor.set_cursor(pos, buf);
                self.redo.push(action);
                Ok(Step::Applied)
            }
            Err(e) => {
                self.history.push_back(action);
                Err(e)
            }
        }
    }

    /// Redo the latest undone action.
    ///
    /// # Errors
    ///
    /// As for [`undo`](Self::undo).
    pub fn redo(&mut self, buf: &mut TextBuffer, cursor: &mut CursorSelectionModel) -> Result<Step> {
        let Some(action) = self.redo.pop() else {
            return Ok(Step::Empty);
        };
        match action.apply(buf) {
            Ok(pos) => {
                cursor.clear_selection();
                cursor.set_cursor(pos, buf);
                self.history.push_back(action);
                Ok(Step::Applied)
            }
            Err(e) => {
                self.redo.push(action);
                Err(e)
            }
        }
    }

    /// Forget everything (new or reloaded document).
    pub fn clear(&mut self) {
        self.history.clear();
        self.redo.clear();
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    struct Fixture {
        buf: TextBuffer,
        cur: CursorSelectionModel,
        log: UndoRedoLog,
    }

    impl Fixture {
        fn new(lines: &[&str]) -> Self {
            Self {
                buf: TextBuffer::from_lines(lines),
                cur: CursorSelectionModel::new(),
                log: UndoRedoLog::new(),
            }
        }

        fn insert(&mut self, pos: Position, text: &str) {
            let end = self.buf.insert_text(pos, text).unwrap();
            self.cur.set_cursor(end, &self.buf);
            self.log.record(UndoAction::Insert {
                text: text.into(),
                position: pos,
            });
        }

        fn delete(&mut self, start: Position, end: Position) {
            let text = self.buf.delete_range(start, end).unwrap();
            self.cur.set_cursor(start, &self.buf);
            self.log.record(UndoAction::Delete { text, start, end });
        }

        fn undo(&mut self) -> Step {
            self.log.undo(&mut self.buf, &mut self.cur).unwrap()
        }

        fn redo(&mut self) -> Step {
            self.log.redo(&mut self.buf, &mut self.cur).unwrap()
        }
    }

    // -- Insert -------------------------------------------------------------

    #[test]
    fn undo_insert_restores_text_and_cursor() {
        let mut f = Fixture::new(&["abc"]);
        f.insert(p(0, 1), "X");
        assert_eq!(f.buf.lines(), vec!["aXbc"]);
        assert_eq!(f.cur.cursor(), p(0, 2));

        assert_eq!(f.undo(), Step::Applied);
        assert_eq!(f.buf.lines(), vec!["abc"]);
        assert_eq!(f.cur.cursor(), p(0, 1));
    }

    #[test]
    fn multi_line_insert_undoes_cleanly() {
        let mut f = Fixture::new(&["head tail"]);
        f.insert(p(0, 4), "\nmid\n");
        f.undo();
        assert_eq!(f.buf.lines(), vec!["head tail"]);
    }

    #[test]
    fn unicode_separators_undo_as_plain_chars() {
        let mut f = Fixture::new(&["ab"]);
        f.insert(p(0, 1), "x\u{2028}y\u{c}z\u{85}");
        assert_eq!(f.buf.line_count(), 1);
        assert_eq!(f.cur.cursor(), p(0, 7));
        f.undo();
        assert_eq!(f.buf.lines(), vec!["ab"]);
        assert_eq!(f.cur.cursor(), p(0, 1));
    }

    // -- Delete -------------------------------------------------------------

    #[test]
    fn undo_delete_reinserts_and_moves_to_end() {
        let mut f = Fixture::new(&["foo", "bar"]);
        f.delete(p(0, 1), p(1, 2));
        assert_eq!(f.buf.lines(), vec!["fr"]);
        f.undo();
        assert_eq!(f.buf.lines(), vec!["foo", "bar"]);
        assert_eq!(f.cur.cursor(), p(1, 2));
    }

    // -- Redo ---------------------------------------------------------------

    #[test]
    fn undo_then_redo_is_identity() {
        fn check(f: &mut Fixture) {
            let lines = f.buf.lines();
            let cursor = f.cur.cursor();
            let selection = f.cur.selection();
            f.undo();
            f.redo();
            assert_eq!(f.buf.lines(), lines);
            assert_eq!(f.cur.cursor(), cursor);
            assert_eq!(f.cur.selection(), selection);
        }

        let mut f = Fixture::new(&["one", "two"]);
        f.insert(p(1, 3), "!\nthree");
        check(&mut f);
        f.delete(p(0, 0), p(0, 2));
        check(&mut f);
        f.delete(p(0, 1), p(2, 2));
        check(&mut f);
        assert_eq!(f.buf.lines(), vec!["eree"]);
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut f = Fixture::new(&[""]);
        f.insert(p(0, 0), "a");
        f.undo();
        assert!(f.log.can_redo());
        f.insert(p(0, 0), "b");
        assert!(!f.log.can_redo());
        assert_eq!(f.redo(), Step::Empty);
    }

    #[test]
    fn empty_sequences_are_no_ops() {
        let mut f = Fixture::new(&["x"]);
        assert_eq!(f.undo(), Step::Empty);
        assert_eq!(f.redo(), Step::Empty);
        assert_eq!(f.buf.lines(), vec!["x"]);
    }

    #[test]
    fn undo_clears_selection() {
        let mut f = Fixture::new(&["abc"]);
        f.insert(p(0, 3), "d");
        f.cur.select_all(&f.buf);
        f.undo();
        assert!(!f.cur.has_selection());
    }

    // -- Limit --------------------------------------------------------------

    #[test]
    fn limit_drops_oldest_action() {
        let mut f = Fixture::new(&[""]);
        f.log = UndoRedoLog::with_limit(Some(2));
        f.insert(p(0, 0), "a");
        f.insert(p(0, 1), "b");
        f.insert(p(0, 2), "c");
        assert_eq!(f.log.undo_len(), 2);
        f.undo();
        f.undo();
        assert_eq!(f.undo(), Step::Empty);
        assert_eq!(f.buf.lines(), vec!["a"]);
    }

    #[test]
    fn zero_limit_means_unbounded() {
        let mut log = UndoRedoLog::with_limit(Some(0));
        for i in 0..50 {
            log.record(UndoAction::Insert {
                text: "x".into(),
                position: p(0, i),
            });
        }
        assert_eq!(log.undo_len(), 50);
    }

    #[test]
    fn stale_action_stays_in_history_on_error() {
        let mut f = Fixture::new(&["abc"]);
        f.log.record(UndoAction::Insert {
            text: "zz".into(),
            position: p(4, 0),
        });
        assert!(f.log.undo(&mut f.buf, &mut f.cur).is_err());
        assert!(f.log.can_undo());
    }
}
