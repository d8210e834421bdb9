//! Screen composition.
//!
//! ```text
//!  1 fn main() {              <- text rows: gutter + highlighted line
//!  2     println!("hi");
//!  ...
//!  🦀 main.rs* | rust | utf-8 | Ln 2/3, Col 5 | INS      Git: main (12)
//!  Saved to main.rs           <- message / prompt row
//! ```
//!
//! Each frame is drawn from scratch into the [`Renderer`]; the renderer
//! diffs against what is on the terminal.

use kiln_term::style::Style;

use crate::editor::Editor;
use crate::highlight::StyleId;
use crate::mode::EditorState;
use crate::ports::Renderer;
use crate::viewport::char_width;

pub const MIN_WIDTH: u16 = 20;
pub const MIN_HEIGHT: u16 = 5;

/// Rows below the text area: status line and message line.
const CHROME_ROWS: u16 = 2;

fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn text_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

impl Editor {
    /// Draw the whole screen and present it.
    pub fn render<R: Renderer + ?Sized>(&mut self, ui: &mut R) {
        let (width, height) = ui.size();
        ui.clear();

        if width < MIN_WIDTH || height < MIN_HEIGHT {
            ui.put_str(0, 0, "Window too small", Style::DEFAULT);
            ui.set_cursor(None);
            self.present(ui);
            return;
        }

        let text_rows = height - CHROME_ROWS;
        self.viewport
            .resize(usize::from(width), usize::from(text_rows), self.buffer.line_count());
        self.viewport.follow(self.cursor.cursor(), &self.buffer);

        for y in 0..text_rows {
            let row = self.viewport.scroll_top() + usize::from(y);
            if row >= self.buffer.line_count() {
                break;
            }
            self.draw_line(ui, row, y);
        }
        self.draw_status(ui, width, text_rows);
        self.draw_message(ui, width, height - 1);

        if self.state == EditorState::HelpOverlay {
            self.draw_help(ui, width, height);
            ui.set_cursor(None);
        } else {
            let gutter = self.viewport.gutter_width();
            let cell = self
                .viewport
                .cursor_cell(self.cursor.cursor(), &self.buffer)
                .map(|(col, row)| (to_u16(gutter + col), to_u16(row)));
            ui.set_cursor(cell);
        }
        self.present(ui);
    }

    fn present<R: Renderer + ?Sized>(&self, ui: &mut R) {
        if let Err(e) = ui.present() {
            tracing::warn!(target: "kiln::term", error = %e, "present failed");
        }
    }

    /// Per-char styles for `row`: syntax colours, then search matches, the
    /// selection and the bracket pair painted over them in that order.
    fn line_styles(&mut self, row: usize, line: &str) -> Vec<Style> {
        let theme = &self.ctx.theme;
        let len = line.chars().count();
        let mut styles: Vec<Style> = self
            .highlighter
            .highlight(line, &self.language)
            .iter()
            .flat_map(|t| std::iter::repeat_n(theme.style(t.style), t.text.chars().count()))
            .collect();
        styles.resize(len, theme.style(StyleId::Default));

        let mut paint = |from: usize, to: usize, style: Style| {
            let (from, to) = (from.min(len), to.min(len));
            if from < to {
                styles[from..to].fill(style);
            }
        };
        for m in self.search.on_row(row) {
            paint(m.start, m.end, theme.style(StyleId::SearchMatch));
        }
        if let Some((from, to)) = self
            .cursor
            .normalized_range()
            .and_then(|r| r.cols_on_row(row, len))
        {
            paint(from, to, theme.style(StyleId::Selection));
        }
        if let Some((brow, a, b)) = self.bracket_pair() {
            if brow == row {
                let bracket = theme.style(StyleId::Bracket);
                paint(a, a + 1, bracket);
                paint(b, b + 1, bracket);
            }
        }
        styles
    }

    fn draw_line<R: Renderer + ?Sized>(&mut self, ui: &mut R, row: usize, y: u16) {
        let Ok(line) = self.buffer.line_at(row) else {
            return;
        };
        let gutter = self.viewport.gutter_width();
        let number = format!("{:>w$} ", row + 1, w = gutter.saturating_sub(1));
        ui.put_str(0, y, &number, self.ctx.theme.style(StyleId::LineNumber));

        let styles = self.line_styles(row, &line);
        let left = self.viewport.scroll_left();
        let right = left + self.viewport.text_width();

        // Runs of equal style, clipped to [left, right) display columns.
        let mut run = String::new();
        let mut run_x = 0;
        let mut run_style = Style::DEFAULT;
        let mut col = 0;
        for (ch, style) in line.chars().zip(styles) {
            let w = char_width(ch);
            let start = col;
            col += w;
            if start < left {
                continue;
            }
            if start + w > right {
                break;
            }
            let x = gutter + start - left;
            if !run.is_empty() && style != run_style {
                ui.put_str(to_u16(run_x), y, &run, run_style);
                run.clear();
            }
            if run.is_empty() {
                run_x = x;
                run_style = style;
            }
            run.push(if ch == '\t' { ' ' } else { ch });
        }
        if !run.is_empty() {
            ui.put_str(to_u16(run_x), y, &run, run_style);
        }
    }

    /// Left part of the status line.
    #[must_use]
    pub fn status_text(&self) -> String {
        let cursor = self.cursor.cursor();
        format!(
            " {} {}{} | {} | {} | Ln {}/{}, Col {} | {}",
            self.ctx.icon_for(&self.language),
            self.display_name(),
            if self.buffer.is_modified() { "*" } else { "" },
            self.language,
            self.encoding,
            cursor.row + 1,
            self.buffer.line_count(),
            cursor.col + 1,
            self.insert_mode.tag(),
        )
    }

    fn draw_status<R: Renderer + ?Sized>(&self, ui: &mut R, width: u16, y: u16) {
        let style = self.ctx.theme.style(StyleId::Status);
        ui.put_str(0, y, &" ".repeat(usize::from(width)), style);
        let used = ui.put_str(0, y, &self.status_text(), style);

        if !self.vcs.branch.is_empty() {
            let git = format!("Git: {} ({}) ", self.vcs.branch, self.vcs.commit_count);
            let git_w = to_u16(text_width(&git));
            if used + git_w < width {
                ui.put_str(width - git_w, y, &git, style);
            }
        }
    }

    fn draw_message<R: Renderer + ?Sized>(&self, ui: &mut R, width: u16, y: u16) {
        let Some(msg) = self.message.as_deref() else {
            return;
        };
        let id = if self.message_is_error {
            StyleId::Error
        } else {
            StyleId::Message
        };
        let style = self.ctx.theme.style(id);
        ui.put_str(0, y, &" ".repeat(usize::from(width)), style);
        ui.put_str(0, y, msg, style);
    }

    fn draw_help<R: Renderer + ?Sized>(&self, ui: &mut R, width: u16, height: u16) {
        let entries = self.ctx.keymap.help_lines();
        let key_w = entries.iter().map(|(k, _)| text_width(k)).max().unwrap_or(0);
        let mut body: Vec<String> = entries
            .iter()
            .map(|(k, help)| format!("{k:<key_w$}  {help}"))
            .collect();
        body.push(String::new());
        body.push("Press Esc to close".to_string());

        let inner_w = body.iter().map(|l| text_width(l)).max().unwrap_or(0);
        let box_w = (inner_w + 4).min(usize::from(width));
        let box_h = (body.len() + 2).min(usize::from(height));
        let x0 = to_u16((usize::from(width) - box_w) / 2);
        let y0 = to_u16((usize::from(height) - box_h) / 2);
        let style = self.ctx.theme.style(StyleId::Status);

        let title = " Help ";
        let bar = box_w.saturating_sub(2);
        let pad = bar.saturating_sub(title.len());
        let top = format!(
            "┌{}{title}{}┐",
            "─".repeat(pad / 2),
            "─".repeat(pad - pad / 2)
        );
        ui.put_str(x0, y0, &top, style);
        for (i, line) in body.iter().take(box_h.saturating_sub(2)).enumerate() {
            let fill = inner_w.saturating_sub(text_width(line));
            let row = format!("│ {line}{} │", " ".repeat(fill));
            ui.put_str(x0, y0 + to_u16(i + 1), &row, style);
        }
        let bottom = format!("└{}┘", "─".repeat(bar));
        ui.put_str(x0, y0 + to_u16(box_h - 1), &bottom, style);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::cursor::Motion;
    use crate::editor::tests::editor_with;
    use crate::ports::VcsInfo;
    use crate::testing::FakeFrontend;
    use kiln_term::input::KeyCode;
    use pretty_assertions::assert_eq;

    fn rendered(ed: &mut Editor, w: u16, h: u16) -> FakeFrontend {
        let mut ui = FakeFrontend::new(w, h);
        ed.render(&mut ui);
        ui
    }

    #[test]
    fn tiny_terminal_shows_only_a_notice() {
        let mut ed = editor_with(&["hello"]);
        let ui = rendered(&mut ed, 19, 10);
        assert!(ui.row_text(0).starts_with("Window too small"));
        assert_eq!(ui.row_text(1).trim(), "");
        assert_eq!(ui.presents, 1);
    }

    #[test]
    fn gutter_and_text() {
        let mut ed = editor_with(&["alpha", "beta"]);
        let ui = rendered(&mut ed, 30, 6);
        assert_eq!(ui.row_text(0).trim_end(), "1 alpha");
        assert_eq!(ui.row_text(1).trim_end(), "2 beta");
        assert_eq!(ui.row_text(2).trim_end(), "");
        assert_eq!(ui.cursor(), Some((2, 0)));
    }

    #[test]
    fn gutter_grows_for_long_documents() {
        let lines: Vec<String> = (1..=120).map(|n| n.to_string()).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let mut ed = editor_with(&refs);
        let ui = rendered(&mut ed, 30, 6);
        assert_eq!(ui.row_text(0).trim_end(), "  1 1");
    }

    #[test]
    fn status_line_reports_position_and_mode() {
        let mut ed = editor_with(&["abc", "de"]);
        ed.dispatch(Action::Move(Motion::Down), &mut FakeFrontend::new(80, 24));
        ed.dispatch(Action::InsertChar('x'), &mut FakeFrontend::new(80, 24));
        let ui = rendered(&mut ed, 80, 6);
        let status = ui.row_text(4);
        assert!(status.contains("[No Name]*"), "{status}");
        assert!(status.contains("| text | utf-8 |"), "{status}");
        assert!(status.contains("Ln 2/2, Col 2"), "{status}");
        assert!(status.trim_end().ends_with("INS"), "{status}");
    }

    #[test]
    fn git_info_on_the_right() {
        let mut ed = editor_with(&["x"]);
        ed.vcs = VcsInfo {
            branch: "dev*".into(),
            user_name: String::new(),
            commit_count: "3".into(),
        };
        let ui = rendered(&mut ed, 80, 6);
        assert!(ui.row_text(4).ends_with("Git: dev* (3) "));
    }

    #[test]
    fn message_row_uses_error_style() {
        let mut ed = editor_with(&["x"]);
        ed.set_error("boom");
        let ui = rendered(&mut ed, 40, 6);
        assert!(ui.row_text(5).starts_with("boom"));
        assert_eq!(ui.style_at(0, 5), ed.context().theme.style(StyleId::Error));
    }

    #[test]
    fn selection_and_matches_are_painted() {
        let mut ed = editor_with(&["one two one"]);
        let mut ui = FakeFrontend::new(40, 6).typing("one").key(KeyCode::Enter);
        ed.dispatch(Action::Find, &mut ui);
        let ui = rendered(&mut ed, 40, 6);
        let search = ed.context().theme.style(StyleId::SearchMatch);
        // gutter is 2 wide
        assert_eq!(ui.style_at(2, 0), search);
        assert_eq!(ui.style_at(10, 0), search);
        assert_ne!(ui.style_at(6, 0), search);

        ed.dispatch(Action::Extend(Motion::Right), &mut FakeFrontend::new(40, 6));
        let ui = rendered(&mut ed, 40, 6);
        let sel = ed.context().theme.style(StyleId::Selection);
        assert_eq!(ui.style_at(2, 0), sel);
        assert_ne!(ui.style_at(3, 0), sel);
    }

    #[test]
    fn bracket_pair_is_highlighted() {
        let mut ed = editor_with(&["f(a)"]);
        ed.dispatch(Action::Move(Motion::Right), &mut FakeFrontend::new(40, 6));
        let ui = rendered(&mut ed, 40, 6);
        let bracket = ed.context().theme.style(StyleId::Bracket);
        assert_eq!(ui.style_at(3, 0), bracket);
        assert_eq!(ui.style_at(5, 0), bracket);
    }

    #[test]
    fn long_lines_scroll_horizontally() {
        let line = format!("{}END", "x".repeat(60));
        let mut ed = editor_with(&[&line]);
        ed.dispatch(Action::Move(Motion::End), &mut FakeFrontend::new(30, 6));
        let ui = rendered(&mut ed, 30, 6);
        let row = ui.row_text(0);
        assert!(row.trim_end().ends_with("END"), "{row}");
        let (x, y) = ui.cursor().unwrap();
        assert_eq!(y, 0);
        assert!(x < 30);
    }

    #[test]
    fn tabs_draw_as_single_spaces() {
        let mut ed = editor_with(&["\tx"]);
        let ui = rendered(&mut ed, 30, 6);
        assert_eq!(ui.row_text(0).trim_end(), "1  x");
    }

    #[test]
    fn help_box_hides_cursor() {
        let mut ed = editor_with(&["x"]);
        ed.state = EditorState::HelpOverlay;
        let ui = rendered(&mut ed, 100, 40);
        assert_eq!(ui.cursor(), None);
        let screen = ui.screen().join("\n");
        assert!(screen.contains(" Help "));
        assert!(screen.contains("Press Esc to close"));
    }
}
