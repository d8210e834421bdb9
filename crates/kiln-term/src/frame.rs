// SPDX-License-Identifier: MIT
//
// Frame — the off-screen grid that a whole screen is painted into.
//
// The editor paints every visible cell into a `Frame`, then the
// `DiffRenderer` compares it with the previously flushed frame and emits
// escapes only for changed cells. Nothing touches the terminal until the
// frame is complete, which is what makes each redraw atomic.
//
// Width model: every character occupies one or two cells. Wide glyphs
// (CJK, most emoji) take two; the second cell is a continuation marker
// that produces no output of its own. Zero-width and control characters
// are shown as U+FFFD in a single cell so the grid never drifts from the
// editor's column arithmetic.

use unicode_width::UnicodeWidthChar;

use crate::style::Style;

/// Placeholder shown for characters with no printable width.
const REPLACEMENT: char = '\u{FFFD}';

/// Continuation marker for the right half of a wide glyph.
const CONTINUATION: char = '\0';

// ─── Cell ────────────────────────────────────────────────────────────────────

/// One screen position: a character and the style it is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub style: Style,
}

impl Cell {
    /// A blank cell in the default style.
    pub const EMPTY: Self = Self {
        ch: ' ',
        style: Style::DEFAULT,
    };

    #[inline]
    #[must_use]
    pub const fn new(ch: char, style: Style) -> Self {
        Self { ch, style }
    }

    /// The right half of a wide glyph. Carries the style so the background
    /// fills both columns.
    #[inline]
    #[must_use]
    pub const fn continuation(style: Style) -> Self {
        Self {
            ch: CONTINUATION,
            style,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_continuation(self) -> bool {
        self.ch == CONTINUATION
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Number of cells `ch` occupies: 2 for wide glyphs, 1 for everything else.
#[inline]
#[must_use]
pub fn cell_width(ch: char) -> u16 {
    if ch.width() == Some(2) { 2 } else { 1 }
}

// ─── Frame ───────────────────────────────────────────────────────────────────

/// A `width × height` grid of cells, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Frame {
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::EMPTY; usize::from(width) * usize::from(height)],
        }
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        (x < self.width && y < self.height).then(|| &self.cells[self.index(x, y)])
    }

    /// One row as a slice, for whole-row comparisons in the diff.
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        if y >= self.height {
            return None;
        }
        let start = self.index(0, y);
        Some(&self.cells[start..start + usize::from(self.width)])
    }

    /// Blank every cell.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
    }

    /// Change dimensions. Contents are discarded.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells
            .resize(usize::from(width) * usize::from(height), Cell::EMPTY);
    }

    /// Overwrite this frame with `other`, reusing the allocation when the
    /// dimensions match.
    pub fn copy_from(&mut self, other: &Self) {
        if self.width == other.width && self.height == other.height {
            self.cells.copy_from_slice(&other.cells);
        } else {
            other.clone_into(self);
        }
    }

    /// Write a single cell. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if x >= self.width || y >= self.height {
            return;
        }
        self.break_wide_at(x, y);
        let idx = self.index(x, y);
        self.cells[idx] = cell;
    }

    /// Clear the other half of any wide glyph that overlaps `(x, y)`.
    fn break_wide_at(&mut self, x: u16, y: u16) {
        let idx = self.index(x, y);
        if self.cells[idx].is_continuation() && x > 0 {
            self.cells[idx - 1].ch = ' ';
        }
        if x + 1 < self.width && self.cells[idx + 1].is_continuation() {
            self.cells[idx + 1] = Cell::EMPTY;
        }
    }

    /// Paint `text` starting at `(x, y)`, clipped at the right edge.
    ///
    /// A wide glyph that would straddle the right edge is replaced by a
    /// space. Returns the number of columns consumed.
    pub fn put_str(&mut self, x: u16, y: u16, text: &str, style: Style) -> u16 {
        if y >= self.height {
            return 0;
        }
        let mut col = x;

        for ch in text.chars() {
            if col >= self.width {
                break;
            }
            let w = cell_width(ch);
            let shown = match ch.width() {
                Some(0) | None => REPLACEMENT,
                _ => ch,
            };

            if w == 2 {
                if col + 1 >= self.width {
                    self.set(col, y, Cell::new(' ', style));
                    col += 1;
                    break;
                }
                self.set(col, y, Cell::new(shown, style));
                self.set(col + 1, y, Cell::continuation(style));
            } else {
                self.set(col, y, Cell::new(shown, style));
            }
            col = col.saturating_add(w);
        }

        col.saturating_sub(x)
    }

    /// Fill `len` cells of row `y` from column `x` with blanks in `style`.
    pub fn fill(&mut self, x: u16, y: u16, len: u16, style: Style) {
        let end = x.saturating_add(len).min(self.width);
        for col in x..end {
            self.set(col, y, Cell::new(' ', style));
        }
    }

    /// The visible text of a row, continuation cells skipped. Used by tests
    /// and by fakes that want to assert on screen content.
    #[must_use]
    pub fn row_text(&self, y: u16) -> String {
        self.row(y)
            .map(|cells| {
                cells
                    .iter()
                    .filter(|c| !c.is_continuation())
                    .map(|c| c.ch)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame({}x{})", self.width, self.height)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_frame_is_blank() {
        let f = Frame::new(4, 2);
        assert_eq!(f.row_text(0), "    ");
        assert_eq!(f.row_text(1), "    ");
        assert!(f.get(4, 0).is_none());
    }

    #[test]
    fn put_str_ascii() {
        let mut f = Frame::new(8, 1);
        let used = f.put_str(1, 0, "abc", Style::DEFAULT);
        assert_eq!(used, 3);
        assert_eq!(f.row_text(0), " abc    ");
    }

    #[test]
    fn put_str_clips_at_right_edge() {
        let mut f = Frame::new(3, 1);
        assert_eq!(f.put_str(1, 0, "hello", Style::DEFAULT), 2);
        assert_eq!(f.row_text(0), " he");
    }

    #[test]
    fn wide_glyph_takes_two_cells() {
        let mut f = Frame::new(4, 1);
        assert_eq!(f.put_str(0, 0, "中a", Style::DEFAULT), 3);
        assert!(f.get(1, 0).unwrap().is_continuation());
        assert_eq!(f.row_text(0), "中a ");
    }

    #[test]
    fn wide_glyph_at_edge_becomes_space() {
        let mut f = Frame::new(3, 1);
        f.put_str(2, 0, "中", Style::DEFAULT);
        assert_eq!(f.get(2, 0).unwrap().ch, ' ');
    }

    #[test]
    fn overwriting_half_of_wide_glyph_clears_other_half() {
        let mut f = Frame::new(4, 1);
        f.put_str(0, 0, "中", Style::DEFAULT);
        f.set(1, 0, Cell::new('x', Style::DEFAULT));
        assert_eq!(f.row_text(0), " x  ");
    }

    #[test]
    fn control_chars_are_replaced() {
        let mut f = Frame::new(2, 1);
        f.put_str(0, 0, "\u{1}", Style::DEFAULT);
        assert_eq!(f.get(0, 0).unwrap().ch, REPLACEMENT);
    }

    #[test]
    fn fill_uses_style() {
        let mut f = Frame::new(4, 1);
        let s = Style::DEFAULT.with_bg(Color::BLUE);
        f.fill(1, 0, 10, s);
        assert_eq!(f.get(0, 0).unwrap().style, Style::DEFAULT);
        assert_eq!(f.get(3, 0).unwrap().style, s);
    }

    #[test]
    fn copy_from_across_sizes() {
        let mut a = Frame::new(2, 1);
        let mut b = Frame::new(3, 2);
        b.put_str(0, 1, "xyz", Style::DEFAULT);
        a.copy_from(&b);
        assert_eq!(a, b);
    }
}
