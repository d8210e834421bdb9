//! Viewport scrolling.
//!
//! The viewport is the visible window of the document: `scroll_top` rows
//! and `scroll_left` display columns are scrolled away. It is the one place
//! that knows a char can take two terminal cells. Everything else in the
//! editor counts chars.
//!
//! ```text
//!   gutter   text_width
//!  ┌──────┬────────────────────┐
//!  │  12  │ visible text       │  ← scroll_top
//!  │  13  │                    │
//!  │  ..  │                    │  visible_lines rows
//!  └──────┴────────────────────┘
//!          ↑ scroll_left (display columns)
//! ```

use unicode_width::UnicodeWidthChar;

use crate::buffer::TextBuffer;
use crate::position::Position;

// ---------------------------------------------------------------------------
// Width helpers
// ---------------------------------------------------------------------------

/// Cells taken by `ch`: 2 for wide (CJK, most emoji) glyphs, 1 otherwise.
#[inline]
#[must_use]
pub fn char_width(ch: char) -> usize {
    if ch.width() == Some(2) { 2 } else { 1 }
}

/// Display column of char column `col` in `line`.
#[must_use]
pub fn display_col(line: &str, col: usize) -> usize {
    line.chars().take(col).map(char_width).sum()
}

/// Decimal digits in `n` (at least 1).
#[must_use]
pub const fn digit_count(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// Gutter for a document of `line_count` lines: the digits plus one
/// separator column.
#[must_use]
pub const fn gutter_width(line_count: usize) -> usize {
    digit_count(line_count) + 1
}

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    scroll_top: usize,
    scroll_left: usize,
    visible_lines: usize,
    gutter_width: usize,
    text_width: usize,
}

impl Viewport {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            scroll_top: 0,
            scroll_left: 0,
            visible_lines: 1,
            gutter_width: 2,
            text_width: 1,
        }
    }

    // -- Accessors ----------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    #[inline]
    #[must_use]
    pub const fn scroll_left(&self) -> usize {
        self.scroll_left
    }

    #[inline]
    #[must_use]
    pub const fn visible_lines(&self) -> usize {
        self.visible_lines
    }

    #[inline]
    #[must_use]
    pub const fn gutter_width(&self) -> usize {
        self.gutter_width
    }

    #[inline]
    #[must_use]
    pub const fn text_width(&self) -> usize {
        self.text_width
    }

    // -- Recompute ----------------------------------------------------------

    /// Adopt a new screen geometry. `text_rows` is the number of rows
    /// available for document text. Zero-sized areas count as one cell so
    /// containment still has a row to hold the cursor.
    pub fn resize(&mut self, term_width: usize, text_rows: usize, line_count: usize) {
        self.gutter_width = gutter_width(line_count);
        self.visible_lines = text_rows.max(1);
        self.text_width = term_width.saturating_sub(self.gutter_width).max(1);
    }

    /// Scroll the minimum amount that brings `cursor` into view.
    pub fn follow(&mut self, cursor: Position, buf: &TextBuffer) {
        self.gutter_width = gutter_width(buf.line_count());

        if cursor.row < self.scroll_top {
            self.scroll_top = cursor.row;
        } else if cursor.row >= self.scroll_top + self.visible_lines {
            self.scroll_top = cursor.row + 1 - self.visible_lines;
        }

        let line = buf.line_at(cursor.row).unwrap_or_default();
        let col = display_col(&line, cursor.col);
        // Both cells of a wide glyph must fit; past the end the cursor is one cell.
        let glyph = line.chars().nth(cursor.col).map_or(1, char_width);
        if col < self.scroll_left {
            self.scroll_left = col;
        } else if col + glyph > self.scroll_left + self.text_width {
            self.scroll_left = (col + glyph).saturating_sub(self.text_width).min(col);
        }
    }

    /// Put `row` in the middle of the view (used by goto-line), then make
    /// sure the cursor is still contained.
    pub fn center_on(&mut self, cursor: Position, buf: &TextBuffer) {
        let last_top = buf.line_count().saturating_sub(self.visible_lines);
        self.scroll_top = cursor
            .row
            .saturating_sub(self.visible_lines / 2)
            .min(last_top);
        self.follow(cursor, buf);
    }

    /// Scroll back to the origin (new document).
    pub const fn reset(&mut self) {
        self.scroll_top = 0;
        self.scroll_left = 0;
    }

    /// Screen cell of `cursor` relative to the text area, if visible.
    #[must_use]
    pub fn cursor_cell(&self, cursor: Position, buf: &TextBuffer) -> Option<(usize, usize)> {
        if cursor.row < self.scroll_top || cursor.row >= self.scroll_top + self.visible_lines {
            return None;
        }
        let line = buf.line_at(cursor.row).ok()?;
        let col = display_col(&line, cursor.col).checked_sub(self.scroll_left)?;
        (col < self.text_width).then_some((col, cursor.row - self.scroll_top))
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
