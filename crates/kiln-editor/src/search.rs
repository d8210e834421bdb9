//! Search, regex replace, and bracket matching.
//!
//! Find is a case-insensitive literal search over the whole document. All
//! matches are collected up front into a [`SearchState`], which the screen
//! paints and `find_next` cycles through (wrapping at the end).
//!
//! Matches are char-column spans `start..end` on one row, left to right and
//! top to bottom, never overlapping: after a hit the scan resumes at its end.
//!
//! Replace takes a regular expression and a replacement (`$1` / `${name}`
//! refer to groups) and applies it to every line.

use regex::Regex;

use crate::buffer::TextBuffer;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// One hit: `row`, and the char columns `start..end` on that row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchMatch {
    pub row: usize,
    pub start: usize,
    pub end: usize,
}

impl SearchMatch {
    #[must_use]
    pub const fn new(row: usize, start: usize, end: usize) -> Self {
        Self { row, start, end }
    }
}

impl From<SearchMatch> for (usize, usize, usize) {
    fn from(m: SearchMatch) -> Self {
        (m.row, m.start, m.end)
    }
}

#[inline]
fn eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Non-overlapping case-insensitive matches of `term` in `line`, as char
/// column spans.
#[must_use]
pub fn find_in_line(line: &str, term: &str) -> Vec<(usize, usize)> {
    let pat: Vec<char> = term.chars().collect();
    if pat.is_empty() {
        return Vec::new();
    }
    let chars: Vec<char> = line.chars().collect();
    let mut hits = Vec::new();
    let mut i = 0;
    while i + pat.len() <= chars.len() {
        if chars[i..i + pat.len()]
            .iter()
            .zip(&pat)
            .all(|(&a, &b)| eq_ignore_case(a, b))
        {
            hits.push((i, i + pat.len()));
            i += pat.len();
        } else {
            i += 1;
        }
    }
    hits
}

/// Every match of `term` in the document.
#[must_use]
pub fn find_all(buf: &TextBuffer, term: &str) -> Vec<SearchMatch> {
    if term.is_empty() {
        return Vec::new();
    }
    buf.lines()
        .iter()
        .enumerate()
        .flat_map(|(row, line)| {
            find_in_line(line, term)
                .into_iter()
                .map(move |(start, end)| SearchMatch::new(row, start, end))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// SearchState
// ---------------------------------------------------------------------------

/// Results of the last find, and which one the cursor is on.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    term: String,
    matches: Vec<SearchMatch>,
    current: Option<usize>,
}

impl SearchState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a new search. The current match is the first one, if any.
    pub fn search(&mut self, buf: &TextBuffer, term: &str) -> Option<SearchMatch> {
        self.term = term.to_string();
        self.matches = find_all(buf, term);
        self.current = (!self.matches.is_empty()).then_some(0);
        self.matches.first().copied()
    }

    /// Advance to the next match, wrapping at the end. Returns the match and
    /// its 1-based index.
    pub fn next_match(&mut self) -> Option<(usize, SearchMatch)> {
        if self.matches.is_empty() {
            return None;
        }
        let idx = self.current.map_or(0, |i| (i + 1) % self.matches.len());
        self.current = Some(idx);
        Some((idx + 1, self.matches[idx]))
    }

    /// Drop results and highlights. Returns whether there was anything to
    /// clear.
    pub fn clear(&mut self) -> bool {
        let had = !self.matches.is_empty();
        self.term.clear();
        self.matches.clear();
        self.current = None;
        had
    }

    #[inline]
    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[inline]
    #[must_use]
    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    #[inline]
    #[must_use]
    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Matches on `row`, for painting.
    pub fn on_row(&self, row: usize) -> impl Iterator<Item = &SearchMatch> {
        // Matches are sorted by row.
        let first = self.matches.partition_point(|m| m.row < row);
        self.matches[first..].iter().take_while(move |m| m.row == row)
    }
}

// ---------------------------------------------------------------------------
// Replace
// ---------------------------------------------------------------------------

/// Outcome of [`replace_all`] when something matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replaced {
    pub lines: Vec<String>,
    pub count: usize,
}

/// Apply `pattern` → `replacement` to every line of `lines`.
///
/// Returns `Ok(None)` when nothing matched. The pattern never spans lines.
///
/// # Errors
///
/// [`EditorError::Pattern`](crate::error::EditorError::Pattern) when the
/// pattern does not compile. Nothing is touched in that case.
pub fn replace_all<S: AsRef<str>>(
    lines: &[S],
    pattern: &str,
    replacement: &str,
) -> Result<Option<Replaced>> {
    let re = Regex::new(pattern)?;
    let mut count = 0;
    let out: Vec<String> = lines
        .iter()
        .map(|line| {
            let line = line.as_ref();
            let n = re.find_iter(line).count();
            if n == 0 {
                return line.to_string();
            }
            count += n;
            re.replace_all(line, replacement).into_owned()
        })
        .collect();

    tracing::debug!(target: "kiln::dispatch", %pattern, count, "regex replace");
    Ok((count > 0).then_some(Replaced { lines: out, count }))
}

// ---------------------------------------------------------------------------
// Bracket matching
// ---------------------------------------------------------------------------

const PAIRS: [(char, char); 3] = [('(', ')'), ('[', ']'), ('{', '}')];

/// Column of the bracket matching the one at `col`, searching the same line
/// only. `None` when `col` is not on a bracket or the pair is unbalanced.
#[must_use]
pub fn matching_bracket(line: &str, col: usize) -> Option<usize> {
    let chars: Vec<char> = line.chars().collect();
    let ch = *chars.get(col)?;

    if let Some(&(open, close)) = PAIRS.iter().find(|(o, _)| *o == ch) {
        let mut depth = 0usize;
        for (i, &c) in chars.iter().enumerate().skip(col) {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        None
    } else if let Some(&(open, close)) = PAIRS.iter().find(|(_, c)| *c == ch) {
        let mut depth = 0usize;
        for i in (0..=col).rev() {
            let c = chars[i];
            if c == close {
                depth += 1;
            } else if c == open {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        None
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditorError;
    use pretty_assertions::assert_eq;

    fn tuples(ms: &[SearchMatch]) -> Vec<(usize, usize, usize)> {
        ms.iter().copied().map(Into::into).collect()
    }

    // -- find ---------------------------------------------------------------

    #[test]
    fn banana() {
        let buf = TextBuffer::from_lines(&["banana"]);
        assert_eq!(
            tuples(&find_all(&buf, "a")),
            vec![(0, 1, 2), (0, 3, 4), (0, 5, 6)]
        );
    }

    #[test]
    fn matches_never_overlap() {
        assert_eq!(find_in_line("aaaa", "aa"), vec![(0, 2), (2, 4)]);
        assert_eq!(find_in_line("banana", "ana"), vec![(1, 4)]);
    }

    #[test]
    fn case_insensitive_and_char_columns() {
        let buf = TextBuffer::from_lines(&["Héllo HÉLLO", "", "héllo"]);
        assert_eq!(
            tuples(&find_all(&buf, "hÉllo")),
            vec![(0, 0, 5), (0, 6, 11), (2, 0, 5)]
        );
    }

    #[test]
    fn empty_term_finds_nothing() {
        let buf = TextBuffer::from_lines(&["abc"]);
        assert!(find_all(&buf, "").is_empty());
    }

    // -- SearchState --------------------------------------------------------

    #[test]
    fn next_match_wraps() {
        let buf = TextBuffer::from_lines(&["x.x", "x"]);
        let mut s = SearchState::new();
        assert_eq!(s.search(&buf, "x"), Some(SearchMatch::new(0, 0, 1)));
        assert_eq!(s.next_match(), Some((2, SearchMatch::new(0, 2, 3))));
        assert_eq!(s.next_match(), Some((3, SearchMatch::new(1, 0, 1))));
        assert_eq!(s.next_match(), Some((1, SearchMatch::new(0, 0, 1))));
    }

    #[test]
    fn on_row_filters() {
        let buf = TextBuffer::from_lines(&["aa", "b", "a"]);
        let mut s = SearchState::new();
        s.search(&buf, "a");
        assert_eq!(s.on_row(0).count(), 2);
        assert_eq!(s.on_row(1).count(), 0);
        assert_eq!(s.on_row(2).count(), 1);
    }

    #[test]
    fn clear_reports_whether_anything_was_active() {
        let buf = TextBuffer::from_lines(&["abc"]);
        let mut s = SearchState::new();
        assert!(!s.clear());
        s.search(&buf, "b");
        assert!(s.clear());
        assert!(!s.has_matches());
        assert_eq!(s.next_match(), None);
    }

    // -- replace ------------------------------------------------------------

    #[test]
    fn regex_replace_with_groups() {
        let r = replace_all(&["let a = 1;", "let bb = 22;"], r"(\w+) = (\d+)", "$2 = $1")
            .unwrap()
            .unwrap();
        assert_eq!(r.lines, vec!["let 1 = a;", "let 22 = bb;"]);
        assert_eq!(r.count, 2);
    }

    #[test]
    fn no_match_is_none() {
        assert_eq!(replace_all(&["abc"], "z+", "y").unwrap(), None);
    }

    #[test]
    fn bad_pattern_is_pattern_error() {
        assert!(matches!(
            replace_all(&["abc"], "(unclosed", "x"),
            Err(EditorError::Pattern(_))
        ));
    }

    // -- brackets -----------------------------------------------------------

    #[test]
    fn brackets_match_both_ways() {
        let line = "f(a[1], {b})";
        assert_eq!(matching_bracket(line, 1), Some(11));
        assert_eq!(matching_bracket(line, 11), Some(1));
        assert_eq!(matching_bracket(line, 3), Some(5));
        assert_eq!(matching_bracket(line, 8), Some(10));
        assert_eq!(matching_bracket(line, 0), None);
        assert_eq!(matching_bracket("(()", 0), None);
        assert_eq!(matching_bracket("x", 5), None);
    }
}
