//! Single-line prompt on the message row.
//!
//! [`prompt`] runs its own synchronous key loop: nothing else happens in the
//! editor until the user presses Enter (returns the text) or Escape (returns
//! `None`). Left / Right / Home / End / Backspace / Delete edit the line;
//! printable keys insert.
//!
//! The rest of the screen is left as the last full render drew it; only the
//! bottom row is repainted on each key.

use kiln_term::input::{KeyCode, KeyEvent, Modifiers};
use kiln_term::reader::ReadOutcome;
use kiln_term::style::Style;

use crate::ports::Frontend;
use crate::viewport::char_width;

/// Longest answer accepted, in chars.
pub const MAX_INPUT: usize = 1024;

// ---------------------------------------------------------------------------
// LineInput
// ---------------------------------------------------------------------------

/// Editable text with a char-offset cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineInput {
    text: String,
    cursor: usize,
}

impl LineInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Insert at the cursor. Ignored once the line is [`MAX_INPUT`] long.
    pub fn insert_char(&mut self, ch: char) {
        if self.len() >= MAX_INPUT {
            return;
        }
        let byte = self.char_to_byte(self.cursor);
        self.text.insert(byte, ch);
        self.cursor += 1;
    }

    /// Delete before the cursor. `false` at the start.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let byte = self.char_to_byte(self.cursor);
        self.text.remove(byte);
        true
    }

    /// Delete under the cursor. `false` at the end.
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.len() {
            return false;
        }
        let byte = self.char_to_byte(self.cursor);
        self.text.remove(byte);
        true
    }

    pub const fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    pub const fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.len();
    }

    fn char_to_byte(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map_or(self.text.len(), |(byte, _)| byte)
    }
}

// ---------------------------------------------------------------------------
// Prompt loop
// ---------------------------------------------------------------------------

/// What one key did to the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Confirm,
    Cancel,
}

fn apply_key(input: &mut LineInput, key: KeyEvent) -> Step {
    let ctrl_or_alt = key.modifiers.intersects(Modifiers::CTRL | Modifiers::ALT);
    match key.code {
        KeyCode::Enter => return Step::Confirm,
        KeyCode::Escape => return Step::Cancel,
        KeyCode::Backspace => {
            input.backspace();
        }
        KeyCode::Delete => {
            input.delete();
        }
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        KeyCode::Char(c) if !ctrl_or_alt && !c.is_control() => input.insert_char(c),
        _ => {}
    }
    Step::Continue
}

fn draw(ui: &mut dyn Frontend, label: &str, input: &LineInput, style: Style) {
    let (width, height) = ui.size();
    let row = height.saturating_sub(1);
    ui.put_str(0, row, &" ".repeat(usize::from(width)), style);
    let label_w = ui.put_str(0, row, label, style);

    // Scroll the answer so the cursor stays on screen.
    let avail = usize::from(width.saturating_sub(label_w)).max(1);
    let chars: Vec<char> = input.text().chars().collect();
    let mut start = 0;
    while start < input.cursor()
        && chars[start..input.cursor()]
            .iter()
            .map(|&c| char_width(c))
            .sum::<usize>()
            >= avail
    {
        start += 1;
    }

    let visible: String = chars[start..].iter().collect();
    ui.put_str(label_w, row, &visible, style);

    let cursor_w: usize = chars[start..input.cursor()].iter().map(|&c| char_width(c)).sum();
    let x = u16::try_from(usize::from(label_w) + cursor_w).unwrap_or(u16::MAX);
    ui.set_cursor(Some((x.min(width.saturating_sub(1)), row)));
}

/// Ask for a line of text. `None` when the user pressed Escape or input
/// ended.
pub fn prompt(ui: &mut dyn Frontend, label: &str, style: Style) -> Option<String> {
    let mut input = LineInput::new();
    loop {
        draw(ui, label, &input, style);
        if let Err(e) = ui.present() {
            tracing::warn!(target: "kiln::dispatch", error = %e, "prompt redraw failed");
        }
        match ui.next_key(None) {
            ReadOutcome::Key(key) => match apply_key(&mut input, key) {
                Step::Continue => {}
                Step::Confirm => return Some(input.text().to_string()),
                Step::Cancel => return None,
            },
            ReadOutcome::Timeout => {}
            ReadOutcome::Closed => return None,
        }
    }
}

/// Yes/no question. Only an answer starting with `y` counts as yes.
pub fn confirm(ui: &mut dyn Frontend, question: &str, style: Style) -> bool {
    prompt(ui, question, style).is_some_and(|a| a.trim_start().to_lowercase().starts_with('y'))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
