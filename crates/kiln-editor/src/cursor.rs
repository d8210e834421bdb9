//! Cursor and selection.
//!
//! The model is a position plus an optional [`Selection`]. "No selection"
//! (`None`) and an empty selection (`anchor == active`) are different states:
//! copy on an empty selection copies nothing, while copy without a selection
//! reports that there is nothing selected.
//!
//! Vertical moves keep the current column unless the target line is shorter,
//! in which case the column clamps to that line's length. There is no sticky
//! column: the clamped column is what the next move starts from.
//!
//! Every operation clamps instead of failing.

use crate::buffer::TextBuffer;
use crate::position::{Position, Range};

/// A cursor motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motion {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

/// An in-progress selection. `anchor` stays put, `active` follows the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub active: Position,
}

impl Selection {
    /// The selection in document order. Use this, never the raw ends, for
    /// extraction or deletion.
    #[must_use]
    pub fn normalized(self) -> Range {
        Range::ordered(self.anchor, self.active)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorSelectionModel {
    cursor: Position,
    selection: Option<Selection>,
}

impl CursorSelectionModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Accessors ----------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> Position {
        self.cursor
    }

    #[inline]
    #[must_use]
    pub const fn selection(&self) -> Option<Selection> {
        self.selection
    }

    #[inline]
    #[must_use]
    pub const fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    /// The selection in document order, if there is one.
    #[must_use]
    pub fn normalized_range(&self) -> Option<Range> {
        self.selection.map(Selection::normalized)
    }

    // -- Direct placement ---------------------------------------------------

    /// Put the cursor at `pos`, clamped into the buffer. Leaves the
    /// selection alone.
    pub fn set_cursor(&mut self, pos: Position, buf: &TextBuffer) {
        self.cursor = buf.clamp(pos);
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Select from the origin to the end of the last line, whatever the
    /// current state.
    pub fn select_all(&mut self, buf: &TextBuffer) {
        let end = buf.end();
        self.selection = Some(Selection {
            anchor: Position::ZERO,
            active: end,
        });
        self.cursor = end;
    }

    /// Re-clamp cursor and selection after the buffer changed underneath.
    pub fn clamp_to(&mut self, buf: &TextBuffer) {
        self.cursor = buf.clamp(self.cursor);
        if let Some(sel) = &mut self.selection {
            sel.anchor = buf.clamp(sel.anchor);
            sel.active = buf.clamp(sel.active);
        }
    }

    /// Back to the origin with no selection.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // -- Movement -----------------------------------------------------------

    /// Move the cursor and drop any selection. `page` is the number of rows
    /// a page motion travels.
    pub fn move_cursor(&mut self, motion: Motion, buf: &TextBuffer, page: usize) {
        self.cursor = step(self.cursor, motion, buf, page);
        self.selection = None;
    }

    /// Move the cursor and grow the selection with it. The first call
    /// without a selection anchors it at the current cursor.
    pub fn extend_selection(&mut self, motion: Motion, buf: &TextBuffer, page: usize) {
        let anchor = self.selection.map_or(self.cursor, |s| s.anchor);
        self.cursor = step(self.cursor, motion, buf, page);
        self.selection = Some(Selection {
            anchor,
            active: self.cursor,
        });
    }
}

/// Where `motion` takes `from`.
fn step(from: Position, motion: Motion, buf: &TextBuffer, page: usize) -> Position {
    let from = buf.clamp(from);
    let last_row = buf.line_count() - 1;
    let vertical = |row: usize| Position::new(row, from.col.min(buf.line_len(row)));

    match motion {
        Motion::Up => vertical(from.row.saturating_sub(1)),
        Motion::Down => vertical((from.row + 1).min(last_row)),
        Motion::PageUp => vertical(from.row.saturating_sub(page.max(1))),
        Motion::PageDown => vertical((from.row + page.max(1)).min(last_row)),
        Motion::Left if from.col > 0 => Position::new(from.row, from.col - 1),
        Motion::Left if from.row > 0 => Position::new(from.row - 1, buf.line_len(from.row - 1)),
        Motion::Left => from,
        Motion::Right if from.col < buf.line_len(from.row) => Position::new(from.row, from.col + 1),
        Motion::Right if from.row < last_row => Position::new(from.row + 1, 0),
        Motion::Right => from,
        Motion::Home => Position::new(from.row, 0),
        Motion::End => Position::new(from.row, buf.line_len(from.row)),
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

    fn at(buf: &TextBuffer, pos: Position) -> CursorSelectionModel {
        let mut m = CursorSelectionModel::new();
        m.set_cursor(pos, buf);
        m
    }

    fn assert_in_bounds(m: &CursorSelectionModel, buf: &TextBuffer) {
        let c = m.cursor();
        assert!(c.row < buf.line_count(), "row {c:?}");
        assert!(c.col <= buf.line_len(c.row), "col {c:?}");
    }

    // -- Vertical -----------------------------------------------------------

    #[test]
    fn vertical_move_clamps_to_shorter_line() {
        let b = TextBuffer::from_lines(&["long line", "ab", "another long"]);
        let mut m = at(&b, p(0, 7));
        m.move_cursor(Motion::Down, &b, 10);
        assert_eq!(m.cursor(), p(1, 2));
        // No sticky column: the clamped column carries on.
        m.move_cursor(Motion::Down, &b, 10);
        assert_eq!(m.cursor(), p(2, 2));
    }

    #[test]
    fn vertical_moves_stop_at_edges() {
        let b = TextBuffer::from_lines(&["a", "b"]);
        let mut m = at(&b, p(0, 0));
        m.move_cursor(Motion::Up, &b, 10);
        assert_eq!(m.cursor(), p(0, 0));
        m.move_cursor(Motion::Down, &b, 10);
        m.move_cursor(Motion::Down, &b, 10);
        assert_eq!(m.cursor(), p(1, 0));
    }

    #[test]
    fn page_moves_travel_page_rows_and_clamp() {
        let lines: Vec<String> = (0..50).map(|i| format!("line {i}")).collect();
        let b = TextBuffer::from_lines(&lines);
        let mut m = at(&b, p(10, 3));
        m.move_cursor(Motion::PageDown, &b, 20);
        assert_eq!(m.cursor(), p(30, 3));
        m.move_cursor(Motion::PageDown, &b, 30);
        assert_eq!(m.cursor(), p(49, 3));
        m.move_cursor(Motion::PageUp, &b, 100);
        assert_eq!(m.cursor(), p(0, 3));
    }

    // -- Horizontal ---------------------------------------------------------

    #[test]
    fn left_at_line_start_wraps_to_previous_end() {
        let b = TextBuffer::from_lines(&["abc", "de"]);
        let mut m = at(&b, p(1, 0));
        m.move_cursor(Motion::Left, &b, 1);
        assert_eq!(m.cursor(), p(0, 3));
    }

    #[test]
    fn right_at_line_end_wraps_to_next_start() {
        let b = TextBuffer::from_lines(&["abc", "de"]);
        let mut m = at(&b, p(0, 3));
        m.move_cursor(Motion::Right, &b, 1);
        assert_eq!(m.cursor(), p(1, 0));
        m.move_cursor(Motion::End, &b, 1);
        m.move_cursor(Motion::Right, &b, 1);
        assert_eq!(m.cursor(), p(1, 2));
    }

    #[test]
    fn home_and_end() {
        let b = TextBuffer::from_lines(&["hello"]);
        let mut m = at(&b, p(0, 2));
        m.move_cursor(Motion::End, &b, 1);
        assert_eq!(m.cursor(), p(0, 5));
        m.move_cursor(Motion::Home, &b, 1);
        assert_eq!(m.cursor(), p(0, 0));
    }

    // -- Selection ----------------------------------------------------------

    #[test]
    fn plain_move_clears_selection() {
        let b = TextBuffer::from_lines(&["abc"]);
        let mut m = at(&b, p(0, 0));
        m.extend_selection(Motion::Right, &b, 1);
        assert!(m.has_selection());
        m.move_cursor(Motion::Right, &b, 1);
        assert!(!m.has_selection());
    }

    #[test]
    fn extend_anchors_at_first_call() {
        let b = TextBuffer::from_lines(&["abcdef"]);
        let mut m = at(&b, p(0, 2));
        m.extend_selection(Motion::Right, &b, 1);
        m.extend_selection(Motion::Right, &b, 1);
        assert_eq!(
            m.selection(),
            Some(Selection {
                anchor: p(0, 2),
                active: p(0, 4)
            })
        );
    }

    #[test]
    fn backwards_selection_normalizes() {
        let b = TextBuffer::from_lines(&["abc", "def"]);
        let mut m = at(&b, p(1, 1));
        m.extend_selection(Motion::Up, &b, 1);
        assert_eq!(m.normalized_range(), Some(Range::ordered(p(0, 1), p(1, 1))));
        assert_eq!(m.normalized_range().map(|r| r.start), Some(p(0, 1)));
    }

    #[test]
    fn selection_is_symmetric() {
        let a = Selection {
            anchor: p(0, 4),
            active: p(2, 1),
        };
        let b = Selection {
            anchor: p(2, 1),
            active: p(0, 4),
        };
        assert_eq!(a.normalized(), b.normalized());
    }

    #[test]
    fn select_all_covers_document() {
        let b = TextBuffer::from_lines(&["ab", "cd"]);
        let mut m = at(&b, p(1, 1));
        m.select_all(&b);
        assert_eq!(m.normalized_range(), Some(Range::ordered(p(0, 0), p(1, 2))));
    }

    #[test]
    fn empty_selection_differs_from_none() {
        let b = TextBuffer::from_lines(&["abc"]);
        let mut m = at(&b, p(0, 1));
        m.set_selection(Some(Selection {
            anchor: p(0, 1),
            active: p(0, 1),
        }));
        assert!(m.has_selection());
        assert!(m.normalized_range().is_some_and(Range::is_empty));
        m.clear_selection();
        assert_eq!(m.normalized_range(), None);
    }

    // -- Bounds -------------------------------------------------------------

    #[test]
    fn cursor_stays_in_bounds_under_any_motion() {
        let b = TextBuffer::from_lines(&["", "日本語", "x", ""]);
        let motions = [
            Motion::Down,
            Motion::End,
            Motion::Right,
            Motion::Right,
            Motion::PageDown,
            Motion::Left,
            Motion::Up,
            Motion::PageUp,
            Motion::Left,
        ];
        let mut m = CursorSelectionModel::new();
        for (i, motion) in motions.iter().cycle().take(60).enumerate() {
            if i % 3 == 0 {
                m.extend_selection(*motion, &b, 2);
            } else {
                m.move_cursor(*motion, &b, 2);
            }
            assert_in_bounds(&m, &b);
        }
    }

    #[test]
    fn clamp_to_follows_shrinking_buffer() {
        let mut b = TextBuffer::from_lines(&["abc", "defg"]);
        let mut m = at(&b, p(1, 4));
        m.extend_selection(Motion::Home, &b, 1);
        b.replace_all("x");
        m.clamp_to(&b);
        assert_eq!(m.cursor(), p(0, 0));
        assert_eq!(m.selection().map(|s| s.anchor), Some(p(0, 1)));
    }
}
