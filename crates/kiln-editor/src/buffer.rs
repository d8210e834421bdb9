//! The document text.
//!
//! `TextBuffer` wraps a [`ropey::Rope`] and exposes the document as an
//! ordered sequence of lines. Lines are stored joined by `\n`; no other line
//! separator ever enters the rope, because inserted text is normalised on the
//! way in. The file's own separator style is a save-time concern and lives
//! outside this type.
//!
//! The buffer is never empty: a rope with no chars still has one (empty)
//! line, so `line_count() >= 1` holds without any bookkeeping.

use std::fmt;

use ropey::Rope;

use crate::error::{EditorError, Result};
use crate::position::{Position, Range};

// ---------------------------------------------------------------------------
// Line splitting
// ---------------------------------------------------------------------------

/// Split text into lines on `\r\n`, `\n` or a lone `\r`.
///
/// `"a\n"` yields `["a", ""]`: a trailing separator produces a trailing empty
/// line, so joining the result with `\n` reproduces the normalised input.
#[must_use]
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(std::mem::take(&mut current));
            }
            '\n' => lines.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    lines.push(current);
    lines
}

/// Replace every `\r\n` and lone `\r` with `\n`.
fn normalize(text: &str) -> std::borrow::Cow<'_, str> {
    if text.contains('\r') {
        std::borrow::Cow::Owned(split_lines(text).join("\n"))
    } else {
        std::borrow::Cow::Borrowed(text)
    }
}

// ---------------------------------------------------------------------------
// TextBuffer
// ---------------------------------------------------------------------------

pub struct TextBuffer {
    rope: Rope,
    modified: bool,
}

impl TextBuffer {
    // -- Construction -------------------------------------------------------

    /// A document with a single empty line.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            modified: false,
        }
    }

    /// Build from raw text; any line separator style is accepted.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(&normalize(text)),
            modified: false,
        }
    }

    /// Build from already-split lines. An empty slice gives one empty line.
    #[must_use]
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let joined = lines
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("\n");
        Self::from_text(&joined)
    }

    // -- Read access --------------------------------------------------------

    /// Number of lines, always at least 1.
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Text of line `row` without its separator.
    ///
    /// # Errors
    ///
    /// [`EditorError::OutOfRange`] when `row >= line_count()`.
    pub fn line_at(&self, row: usize) -> Result<String> {
        if row >= self.line_count() {
            return Err(EditorError::OutOfRange {
                row,
                count: self.line_count(),
            });
        }
        let mut line = self.rope.line(row).to_string();
        if line.ends_with('\n') {
            line.pop();
        }
        Ok(line)
    }

    /// Length of line `row` in chars, excluding the separator. Rows past the
    /// end have length 0.
    #[must_use]
    pub fn line_len(&self, row: usize) -> usize {
        if row >= self.line_count() {
            return 0;
        }
        let line = self.rope.line(row);
        let n = line.len_chars();
        if n > 0 && line.char(n - 1) == '\n' { n - 1 } else { n }
    }

    #[must_use]
    pub fn char_at(&self, pos: Position) -> Option<char> {
        if pos.col >= self.line_len(pos.row) {
            return None;
        }
        Some(self.rope.line(pos.row).char(pos.col))
    }

    /// All lines as owned strings.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        (0..self.line_count())
            .map(|row| self.line_at(row).unwrap_or_default())
            .collect()
    }

    /// Full content with lines joined by `\n`.
    #[must_use]
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Text inside `range`, separators as `\n`.
    #[must_use]
    pub fn slice(&self, range: Range) -> String {
        let start = self.char_index(self.clamp(range.start));
        let end = self.char_index(self.clamp(range.end));
        self.rope.slice(start..end).to_string()
    }

    /// Position just after the last char of the document.
    #[must_use]
    pub fn end(&self) -> Position {
        let last = self.line_count() - 1;
        Position::new(last, self.line_len(last))
    }

    /// The nearest valid position: row clamped to the last line, col
    /// clamped to that line's length.
    #[must_use]
    pub fn clamp(&self, pos: Position) -> Position {
        let row = pos.row.min(self.line_count() - 1);
        Position::new(row, pos.col.min(self.line_len(row)))
    }

    /// Whether `pos` is a valid cursor position.
    #[must_use]
    pub fn is_valid(&self, pos: Position) -> bool {
        pos.row < self.line_count() && pos.col <= self.line_len(pos.row)
    }

    // -- Mutation -----------------------------------------------------------

    /// Insert `text` at `pos` and return the position right after it.
    ///
    /// Single-line text is spliced into the row. Multi-line text cuts the
    /// row at `pos.col`, adds the intervening lines, and re-attaches the
    /// tail of the original row to the last inserted line.
    ///
    /// # Errors
    ///
    /// [`EditorError::OutOfRange`] when `pos` is not a valid position.
    pub fn insert_text(&mut self, pos: Position, text: &str) -> Result<Position> {
        self.check(pos)?;
        let text = normalize(text);
        let idx = self.char_index(pos);
        self.rope.insert(idx, &text);
        if !text.is_empty() {
            self.modified = true;
        }
        tracing::trace!(target: "kiln::buffer", row = pos.row, col = pos.col, len = text.len(), "insert");
        Ok(end_after_insert(pos, &text))
    }

    /// Remove the text between `start` and `end` (either order) and return
    /// exactly what was removed.
    ///
    /// Within one row this removes a column slice. Across rows the prefix of
    /// the first row joins the suffix of the last, and every row in between
    /// disappears. Removing everything leaves one empty line.
    ///
    /// # Errors
    ///
    /// [`EditorError::OutOfRange`] when either end is not a valid position.
    pub fn delete_range(&mut self, start: Position, end: Position) -> Result<String> {
        self.check(start)?;
        self.check(end)?;
        let range = Range::ordered(start, end);
        if range.is_empty() {
            return Ok(String::new());
        }
        let from = self.char_index(range.start);
        let to = self.char_index(range.end);
        let removed = self.rope.slice(from..to).to_string();
        self.rope.remove(from..to);
        self.modified = true;
        tracing::trace!(target: "kiln::buffer", ?range, len = removed.len(), "delete");
        Ok(removed)
    }

    /// Replace the whole document. Clears the modified flag.
    pub fn replace_all(&mut self, text: &str) {
        self.rope = Rope::from_str(&normalize(text));
        self.modified = false;
    }

    // -- Modified flag ------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    #[inline]
    pub const fn mark_saved(&mut self) {
        self.modified = false;
    }

    #[inline]
    pub const fn mark_modified(&mut self) {
        self.modified = true;
    }

    // -- Internals ----------------------------------------------------------

    fn check(&self, pos: Position) -> Result<()> {
        if self.is_valid(pos) {
            Ok(())
        } else {
            Err(EditorError::OutOfRange {
                row: pos.row,
                count: self.line_count(),
            })
        }
    }

    fn char_index(&self, pos: Position) -> usize {
        self.rope.line_to_char(pos.row) + pos.col
    }
}

/// Where the cursor lands after inserting `text` at `pos`.
#[must_use]
pub fn end_after_insert(pos: Position, text: &str) -> Position {
    match text.rfind('\n') {
        None => Position::new(pos.row, pos.col + text.chars().count()),
        Some(last_nl) => Position::new(
            pos.row + text.matches('\n').count(),
            text[last_nl + 1..].chars().count(),
        ),
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextBuffer")
            .field("lines", &self.line_count())
            .field("chars", &self.rope.len_chars())
            .field("modified", &self.modified)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn buf(lines: &[&str]) -> TextBuffer {
        TextBuffer::from_lines(lines)
    }

    fn p(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    // -- Construction -------------------------------------------------------

    #[test]
    fn empty_buffer_has_one_empty_line() {
        let b = TextBuffer::new();
        assert_eq!(b.line_count(), 1);
        assert_eq!(b.lines(), vec![String::new()]);
        assert!(!b.is_modified());
    }

    #[test]
    fn from_text_accepts_every_separator() {
        let b = TextBuffer::from_text("a\r\nb\rc\nd");
        assert_eq!(b.lines(), vec!["a", "b", "c", "d"]);
        assert_eq!(b.text(), "a\nb\nc\nd");
    }

    #[test]
    fn trailing_newline_gives_trailing_empty_line() {
        assert_eq!(split_lines("x\n"), vec!["x", ""]);
        assert_eq!(split_lines(""), vec![""]);
    }

    // -- Accessors ----------------------------------------------------------

    #[test]
    fn line_at_out_of_range_is_an_error() {
        let b = buf(&["one", "two"]);
        assert_eq!(b.line_at(1).unwrap(), "two");
        assert!(matches!(
            b.line_at(2),
            Err(EditorError::OutOfRange { row: 2, count: 2 })
        ));
    }

    #[test]
    fn line_len_counts_chars_not_bytes() {
        let b = buf(&["café", "日本"]);
        assert_eq!(b.line_len(0), 4);
        assert_eq!(b.line_len(1), 2);
        assert_eq!(b.line_len(9), 0);
        assert_eq!(b.char_at(p(0, 3)), Some('é'));
        assert_eq!(b.char_at(p(0, 4)), None);
    }

    #[test]
    fn clamp_pulls_positions_inside() {
        let b = buf(&["abc", "d"]);
        assert_eq!(b.clamp(p(5, 9)), p(1, 1));
        assert_eq!(b.clamp(p(0, 9)), p(0, 3));
        assert_eq!(b.end(), p(1, 1));
    }

    // -- insert_text --------------------------------------------------------

    #[test]
    fn single_line_insert_splices_into_row() {
        let mut b = buf(&["abc"]);
        let end = b.insert_text(p(0, 1), "X").unwrap();
        assert_eq!(b.lines(), vec!["aXbc"]);
        assert_eq!(end, p(0, 2));
        assert!(b.is_modified());
    }

    #[test]
    fn multi_line_insert_carries_tail_to_last_line() {
        let mut b = buf(&["hello world"]);
        let end = b.insert_text(p(0, 5), "\nnew\nlast").unwrap();
        assert_eq!(b.lines(), vec!["hello", "new", "last world"]);
        assert_eq!(end, p(2, 4));
    }

    #[test]
    fn insert_normalises_crlf() {
        let mut b = buf(&[""]);
        let end = b.insert_text(p(0, 0), "a\r\nb").unwrap();
        assert_eq!(b.lines(), vec!["a", "b"]);
        assert_eq!(end, p(1, 1));
    }

    #[test]
    fn only_newline_breaks_lines() {
        let b = TextBuffer::from_text("a\u{c}b");
        assert_eq!(b.line_count(), 1);
        assert_eq!(b.lines(), vec!["a\u{c}b"]);

        let mut b = buf(&[""]);
        let end = b.insert_text(p(0, 0), "x\u{2028}yz").unwrap();
        assert_eq!(b.lines(), vec!["x\u{2028}yz"]);
        assert_eq!(end, p(0, 4));
        assert_eq!(b.line_len(0), 4);
        assert!(b.is_valid(end));
    }

    #[test]
    fn insert_at_invalid_position_fails_without_change() {
        let mut b = buf(&["ab"]);
        assert!(b.insert_text(p(0, 3), "x").is_err());
        assert!(b.insert_text(p(1, 0), "x").is_err());
        assert_eq!(b.lines(), vec!["ab"]);
        assert!(!b.is_modified());
    }

    // -- delete_range -------------------------------------------------------

    #[test]
    fn delete_within_row() {
        let mut b = buf(&["abcdef"]);
        assert_eq!(b.delete_range(p(0, 1), p(0, 4)).unwrap(), "bcd");
        assert_eq!(b.lines(), vec!["aef"]);
    }

    #[test]
    fn delete_spanning_two_lines() {
        let mut b = buf(&["foo", "bar"]);
        assert_eq!(b.delete_range(p(0, 1), p(1, 2)).unwrap(), "oo\nba");
        assert_eq!(b.lines(), vec!["fr"]);
    }

    #[test]
    fn delete_removes_rows_in_between() {
        let mut b = buf(&["one", "two", "three", "four"]);
        b.delete_range(p(0, 2), p(2, 1)).unwrap();
        assert_eq!(b.lines(), vec!["onhree", "four"]);
    }

    #[test]
    fn delete_accepts_reversed_endpoints() {
        let mut b = buf(&["abcdef"]);
        assert_eq!(b.delete_range(p(0, 4), p(0, 1)).unwrap(), "bcd");
    }

    #[test]
    fn delete_everything_leaves_one_empty_line() {
        let mut b = buf(&["ab", "cd"]);
        b.delete_range(p(0, 0), p(1, 2)).unwrap();
        assert_eq!(b.line_count(), 1);
        assert_eq!(b.lines(), vec![""]);
    }

    #[test]
    fn empty_delete_is_a_no_op() {
        let mut b = buf(&["ab"]);
        assert_eq!(b.delete_range(p(0, 1), p(0, 1)).unwrap(), "");
        assert!(!b.is_modified());
    }

    // -- Round trip ---------------------------------------------------------

    #[test]
    fn insert_then_delete_restores_content() {
        let original = ["fn main() {", "    body();", "}"];
        for (pos, text) in [
            (p(0, 0), "x"),
            (p(1, 4), "let a = 1;\n    "),
            (p(2, 1), "\n\n"),
            (p(0, 11), " // ü"),
        ] {
            let mut b = buf(&original);
            let end = b.insert_text(pos, text).unwrap();
            let removed = b.delete_range(pos, end).unwrap();
            assert_eq!(removed, text);
            assert_eq!(b.lines(), original);
        }
    }

    #[test]
    fn slice_matches_delete_result() {
        let b = buf(&["foo", "bar"]);
        assert_eq!(b.slice(Range::ordered(p(0, 1), p(1, 2))), "oo\nba");
    }

    #[test]
    fn replace_all_resets_modified() {
        let mut b = buf(&["x"]);
        b.insert_text(p(0, 0), "y").unwrap();
        b.replace_all("new\ntext");
        assert_eq!(b.lines(), vec!["new", "text"]);
        assert!(!b.is_modified());
    }

    #[test]
    fn end_after_insert_handles_multibyte_tail() {
        assert_eq!(end_after_insert(p(3, 2), "ab"), p(3, 4));
        assert_eq!(end_after_insert(p(3, 2), "a\nüb"), p(4, 2));
    }
}
