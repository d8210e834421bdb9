//! The editor: one document, its view state, and the action dispatcher.
//!
//! [`Editor`] owns everything mutable (buffer, cursor, undo log, highlight
//! cache) and is only ever touched from the UI thread. Keys come in through
//! [`Editor::handle_key`], are looked up in the keymap and run by
//! [`Editor::dispatch`], which matches on [`Action`] exhaustively.
//!
//! Workers (autosave timer, git, lint, VCS info) talk back through the
//! [`BackgroundTaskBridge`]; [`Editor::drain_bridge`] applies what they sent
//! once per loop iteration.
//!
//! Every user edit goes through [`Editor::insert_recorded`] or
//! [`Editor::delete_recorded`] so the undo log sees exactly what the buffer
//! saw. Errors are turned into a status message at the operation boundary
//! and never leave the dispatcher.
//!
//! File operations live in `fileops`, external tools in `tools`, and screen
//! composition in `screen`; they are further `impl Editor` blocks.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use kiln_term::input::{KeyCode, KeyEvent};
use kiln_term::reader::ReadOutcome;

use crate::action::Action;
use crate::bridge::{AutosaveTimer, BackgroundTaskBridge, TaskSender};
use crate::buffer::{TextBuffer, split_lines};
use crate::config::{EditorContext, EditorSettings};
use crate::cursor::CursorSelectionModel;
use crate::encoding::TextEncoding;
use crate::error::Result;
use crate::highlight::{StyleId, SyntaxHighlightCache, tokenizer_for};
use crate::history::{Step, UndoAction, UndoRedoLog};
use crate::keys::KeyChord;
use crate::mode::{EditorState, InsertMode};
use crate::ports::{
    Clipboard, CommandRunner, Frontend, GitInfo, InternalClipboard, ProcessRunner,
    SystemClipboard, VcsInfo, VcsInfoProvider,
};
use crate::position::{Position, Range};
use crate::prompt;
use crate::search::{self, SearchState};
use crate::viewport::Viewport;

/// How long the main loop waits for a key before draining the bridge again.
pub const TICK: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// The external capabilities an editor is built with.
pub struct Services {
    pub runner: Arc<dyn CommandRunner>,
    pub vcs: Arc<dyn VcsInfoProvider>,
    /// System clipboard, when one is configured and available.
    pub clipboard: Option<Box<dyn Clipboard>>,
}

impl Services {
    /// Real processes, git, and whatever clipboard tool is on `$PATH`.
    #[must_use]
    pub fn system(settings: &EditorSettings) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner);
        let clipboard = if settings.use_system_clipboard {
            SystemClipboard::detect(Arc::clone(&runner)).map(|c| Box::new(c) as Box<dyn Clipboard>)
        } else {
            None
        };
        Self {
            vcs: Arc::new(GitInfo::new(Arc::clone(&runner))),
            runner,
            clipboard,
        }
    }
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

pub struct Editor {
    pub(crate) ctx: EditorContext,

    pub(crate) buffer: TextBuffer,
    pub(crate) cursor: CursorSelectionModel,
    pub(crate) viewport: Viewport,
    pub(crate) history: UndoRedoLog,
    pub(crate) highlighter: SyntaxHighlightCache,
    pub(crate) search: SearchState,

    pub(crate) insert_mode: InsertMode,
    /// Modal state. `Editing` here may still report as `Selecting`; see
    /// [`Editor::state`].
    pub(crate) state: EditorState,

    /// Text on the message line. Cleared on the next keypress.
    pub(crate) message: Option<String>,
    pub(crate) message_is_error: bool,

    /// `None` until the document is saved or opened.
    pub(crate) path: Option<PathBuf>,
    pub(crate) encoding: TextEncoding,
    pub(crate) language: String,
    pub(crate) vcs: VcsInfo,

    pub(crate) internal_clipboard: InternalClipboard,
    pub(crate) system_clipboard: Option<Box<dyn Clipboard>>,
    pub(crate) runner: Arc<dyn CommandRunner>,
    pub(crate) vcs_provider: Arc<dyn VcsInfoProvider>,

    pub(crate) bridge: BackgroundTaskBridge,
    pub(crate) autosave: Option<AutosaveTimer>,

    pub(crate) quit: bool,
}

impl Editor {
    /// An editor with an empty, unnamed document.
    #[must_use]
    pub fn new(ctx: EditorContext, services: Services) -> Self {
        let language = "text".to_string();
        Self {
            history: UndoRedoLog::with_limit(ctx.settings().undo_limit),
            highlighter: SyntaxHighlightCache::new(tokenizer_for(&language)),
            ctx,
            buffer: TextBuffer::new(),
            cursor: CursorSelectionModel::new(),
            viewport: Viewport::new(),
            search: SearchState::new(),
            insert_mode: InsertMode::default(),
            state: EditorState::default(),
            message: None,
            message_is_error: false,
            path: None,
            encoding: TextEncoding::default(),
            language,
            vcs: VcsInfo::default(),
            internal_clipboard: InternalClipboard::default(),
            system_clipboard: services.clipboard,
            runner: services.runner,
            vcs_provider: services.vcs,
            bridge: BackgroundTaskBridge::new(),
            autosave: None,
            quit: false,
        }
    }

    // -- Accessors ----------------------------------------------------------

    #[must_use]
    pub const fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    #[must_use]
    pub const fn cursor(&self) -> &CursorSelectionModel {
        &self.cursor
    }

    #[must_use]
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub const fn history(&self) -> &UndoRedoLog {
        &self.history
    }

    #[must_use]
    pub const fn search(&self) -> &SearchState {
        &self.search
    }

    #[must_use]
    pub const fn context(&self) -> &EditorContext {
        &self.ctx
    }

    /// Current state, with `Selecting` folded in from the cursor model.
    #[must_use]
    pub const fn state(&self) -> EditorState {
        self.state.derive(self.cursor.has_selection())
    }

    #[must_use]
    pub const fn insert_mode(&self) -> InsertMode {
        self.insert_mode
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[must_use]
    pub const fn message_is_error(&self) -> bool {
        self.message_is_error
    }

    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub const fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub const fn vcs_info(&self) -> &VcsInfo {
        &self.vcs
    }

    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.buffer.is_modified()
    }

    #[must_use]
    pub const fn should_quit(&self) -> bool {
        self.quit
    }

    #[must_use]
    pub fn autosave_enabled(&self) -> bool {
        self.autosave.as_ref().is_some_and(AutosaveTimer::is_running)
    }

    /// A producer handle for code outside the editor that wants to post
    /// status text.
    #[must_use]
    pub fn task_sender(&self) -> TaskSender {
        self.bridge.sender()
    }

    // -- Messages -----------------------------------------------------------

    pub(crate) fn set_message(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
        self.message_is_error = false;
    }

    pub(crate) fn set_error(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
        self.message_is_error = true;
    }

    fn clear_message(&mut self) {
        self.message = None;
        self.message_is_error = false;
    }

    /// Turn a failed operation into an error message.
    pub(crate) fn report(&mut self, result: Result<()>) {
        if let Err(e) = result {
            tracing::warn!(target: "kiln::dispatch", error = %e, "operation failed");
            self.set_error(e.to_string());
        }
    }

    // -- Main loop ----------------------------------------------------------

    /// Drain, render, wait for a key, dispatch; until quit or input closes.
    pub fn run(&mut self, ui: &mut dyn Frontend) {
        tracing::info!(target: "kiln::dispatch", "main loop started");
        while !self.quit {
            self.drain_bridge();
            self.render(ui);
            match ui.next_key(Some(TICK)) {
                ReadOutcome::Key(key) => self.handle_key(key, ui),
                ReadOutcome::Timeout => {}
                ReadOutcome::Closed => {
                    tracing::info!(target: "kiln::dispatch", "input closed");
                    break;
                }
            }
        }
        self.stop_autosave();
        tracing::info!(target: "kiln::dispatch", "main loop finished");
    }

    /// Apply everything workers posted since the last call. Status text is
    /// latest-wins; an autosave request is served here, on the UI thread.
    pub fn drain_bridge(&mut self) {
        let drained = self.bridge.drain();
        if let Some(status) = drained.status {
            self.set_message(status);
        }
        if let Some(info) = drained.vcs_info {
            tracing::debug!(target: "kiln::bridge", branch = %info.branch, "vcs info updated");
            self.vcs = info;
        }
        if drained.autosave_requested {
            self.autosave();
        }
    }

    /// Look `key` up in the keymap and run the action.
    pub fn handle_key(&mut self, key: KeyEvent, ui: &mut dyn Frontend) {
        let chord = KeyChord::from(key);
        tracing::trace!(target: "kiln::keys", %chord, code = format_args!("{:#x}", chord.code()), "key");
        self.clear_message();
        match self.ctx.keymap.lookup(chord) {
            Some(action) => self.dispatch(action, ui),
            None => tracing::debug!(target: "kiln::keys", %chord, "unbound key"),
        }
    }

    /// Run one action. Modal actions use `ui` for their prompts.
    pub fn dispatch(&mut self, action: Action, ui: &mut dyn Frontend) {
        tracing::debug!(target: "kiln::dispatch", ?action, "dispatch");
        let page = self.viewport.visible_lines();
        match action {
            Action::Move(motion) => self.cursor.move_cursor(motion, &self.buffer, page),
            Action::Extend(motion) => self.cursor.extend_selection(motion, &self.buffer, page),
            Action::InsertChar(ch) => {
                let r = self.type_char(ch);
                self.report(r);
            }
            Action::Newline => {
                let r = self.newline();
                self.report(r);
            }
            Action::Backspace => {
                let r = self.backspace();
                self.report(r);
            }
            Action::Delete => {
                let r = self.delete_forward();
                self.report(r);
            }
            Action::Tab => {
                let r = self.tab();
                self.report(r);
            }
            Action::ToggleInsertMode => {
                self.insert_mode = self.insert_mode.toggled();
                self.set_message(format!("Mode: {}", self.insert_mode.label()));
            }
            Action::NewFile => self.new_file(ui),
            Action::OpenFile => self.open_file(ui),
            Action::SaveFile => self.save_file(ui),
            Action::SaveAs => self.save_file_as(ui),
            Action::Revert => self.revert(ui),
            Action::Quit => self.request_quit(ui),
            Action::Undo => self.undo(),
            Action::Redo => self.redo(),
            Action::SelectAll => self.cursor.select_all(&self.buffer),
            Action::Copy => self.copy(),
            Action::Cut => self.cut(),
            Action::Paste => self.paste(),
            Action::GotoLine => {
                self.goto_line(ui);
                return;
            }
            Action::Find => self.find(ui),
            Action::FindNext => self.find_next(),
            Action::Replace => self.replace(ui),
            Action::Cancel => self.cancel(),
            Action::GitMenu => self.git_menu(ui),
            Action::Help => self.show_help(ui),
            Action::RunCommand => self.run_command(ui),
            Action::ToggleAutosave => self.toggle_autosave(),
        }
        self.viewport.follow(self.cursor.cursor(), &self.buffer);
    }

    // -- Modal helpers ------------------------------------------------------

    /// Prompt on the message line. `None` on Escape.
    pub(crate) fn ask(&mut self, ui: &mut dyn Frontend, label: &str) -> Option<String> {
        let previous = self.state;
        self.state = EditorState::Prompting;
        let answer = prompt::prompt(ui, label, self.ctx.theme.style(StyleId::Message));
        self.state = previous;
        answer
    }

    pub(crate) fn ask_yes(&mut self, ui: &mut dyn Frontend, question: &str) -> bool {
        let previous = self.state;
        self.state = EditorState::Prompting;
        let yes = prompt::confirm(ui, question, self.ctx.theme.style(StyleId::Message));
        self.state = previous;
        yes
    }

    fn show_help(&mut self, ui: &mut dyn Frontend) {
        self.state = EditorState::HelpOverlay;
        loop {
            self.render(ui);
            match ui.next_key(None) {
                ReadOutcome::Key(KeyEvent {
                    code: KeyCode::Escape,
                    ..
                })
                | ReadOutcome::Closed => break,
                ReadOutcome::Key(_) | ReadOutcome::Timeout => {}
            }
        }
        self.state = EditorState::Editing;
    }

    fn request_quit(&mut self, ui: &mut dyn Frontend) {
        if !self.offer_save(ui) {
            return;
        }
        tracing::info!(target: "kiln::dispatch", "quit requested");
        self.stop_autosave();
        self.quit = true;
    }

    // -- Recorded edits -----------------------------------------------------

    /// Insert `text` at `pos`, record it, and put the cursor after it.
    pub(crate) fn insert_recorded(&mut self, pos: Position, text: &str) -> Result<Position> {
        let end = self.buffer.insert_text(pos, text)?;
        if !text.is_empty() {
            self.history.record(UndoAction::Insert {
                text: text.to_string(),
                position: pos,
            });
        }
        self.after_edit(end);
        Ok(end)
    }

    /// Delete `start..end`, record it, and put the cursor at the start.
    pub(crate) fn delete_recorded(&mut self, start: Position, end: Position) -> Result<String> {
        let range = Range::ordered(start, end);
        let text = self.buffer.delete_range(range.start, range.end)?;
        if !text.is_empty() {
            self.history.record(UndoAction::Delete {
                text: text.clone(),
                start: range.start,
                end: range.end,
            });
        }
        self.after_edit(range.start);
        Ok(text)
    }

    /// Delete the selection if there is one. An empty selection is dropped
    /// without touching the document. Returns whether a selection existed.
    fn delete_selection(&mut self) -> Result<bool> {
        let Some(range) = self.cursor.normalized_range() else {
            return Ok(false);
        };
        self.delete_recorded(range.start, range.end)?;
        Ok(true)
    }

    /// Highlights refer to the old text, so any edit drops them.
    fn after_edit(&mut self, cursor: Position) {
        self.cursor.clear_selection();
        self.cursor.set_cursor(cursor, &self.buffer);
        self.search.clear();
    }

    // -- Editing ------------------------------------------------------------

    fn type_char(&mut self, ch: char) -> Result<()> {
        let had_selection = self.delete_selection()?;
        let pos = self.cursor.cursor();
        if self.insert_mode == InsertMode::Overwrite
            && !had_selection
            && pos.col < self.buffer.line_len(pos.row)
        {
            self.delete_recorded(pos, Position::new(pos.row, pos.col + 1))?;
        }
        let mut utf8 = [0u8; 4];
        self.insert_recorded(pos, ch.encode_utf8(&mut utf8))?;
        Ok(())
    }

    fn newline(&mut self) -> Result<()> {
        self.delete_selection()?;
        self.insert_recorded(self.cursor.cursor(), "\n")?;
        Ok(())
    }

    fn backspace(&mut self) -> Result<()> {
        if self.delete_selection()? {
            return Ok(());
        }
        let pos = self.cursor.cursor();
        if pos.col > 0 {
            self.delete_recorded(Position::new(pos.row, pos.col - 1), pos)?;
        } else if pos.row > 0 {
            let prev = pos.row - 1;
            self.delete_recorded(Position::new(prev, self.buffer.line_len(prev)), pos)?;
        }
        Ok(())
    }

    fn delete_forward(&mut self) -> Result<()> {
        if self.delete_selection()? {
            return Ok(());
        }
        let pos = self.cursor.cursor();
        if pos.col < self.buffer.line_len(pos.row) {
            self.delete_recorded(pos, Position::new(pos.row, pos.col + 1))?;
        } else if pos.row + 1 < self.buffer.line_count() {
            self.delete_recorded(pos, Position::new(pos.row + 1, 0))?;
        }
        Ok(())
    }

    /// At column 0 copy the previous line's indentation; otherwise one
    /// indent unit.
    fn tab(&mut self) -> Result<()> {
        self.delete_selection()?;
        let pos = self.cursor.cursor();
        let inherited = if pos.col == 0 && pos.row > 0 {
            leading_whitespace(&self.buffer.line_at(pos.row - 1)?).to_string()
        } else {
            String::new()
        };
        let text = if !inherited.is_empty() {
            inherited
        } else if self.ctx.settings().use_spaces {
            " ".repeat(self.ctx.settings().tab_size)
        } else {
            "\t".to_string()
        };
        self.insert_recorded(pos, &text)?;
        Ok(())
    }

    // -- History ------------------------------------------------------------

    fn undo(&mut self) {
        match self.history.undo(&mut self.buffer, &mut self.cursor) {
            Ok(Step::Applied) => {
                self.search.clear();
                self.set_message("Undo performed");
            }
            Ok(Step::Empty) => self.set_message("Nothing to undo"),
            Err(e) => self.report(Err(e)),
        }
    }

    fn redo(&mut self) {
        match self.history.redo(&mut self.buffer, &mut self.cursor) {
            Ok(Step::Applied) => {
                self.search.clear();
                self.set_message("Redo performed");
            }
            Ok(Step::Empty) => self.set_message("Nothing to redo"),
            Err(e) => self.report(Err(e)),
        }
    }

    // -- Clipboard ----------------------------------------------------------

    fn selected_text(&self) -> Option<String> {
        let range = self.cursor.normalized_range()?;
        Some(self.buffer.slice(range)).filter(|t| !t.is_empty())
    }

    /// Store `text` in the internal clipboard and, if possible, the system
    /// one. Returns the status message for `verb` ("Copied" / "Cut").
    fn store_clipboard(&mut self, text: &str, verb: &str) -> String {
        let _ = self.internal_clipboard.copy(text);
        match self.system_clipboard.as_mut() {
            Some(system) => match system.copy(text) {
                Ok(()) => format!("{verb} to system clipboard"),
                Err(e) => {
                    tracing::warn!(target: "kiln::io", error = %e, "system clipboard copy failed");
                    format!("{verb} to internal clipboard (system clipboard error)")
                }
            },
            None => format!("{verb} to internal clipboard"),
        }
    }

    fn fetch_clipboard(&mut self) -> (String, &'static str) {
        let internal = self.internal_clipboard.paste().unwrap_or_default();
        match self.system_clipboard.as_mut().map(|c| c.paste()) {
            Some(Ok(text)) if !text.is_empty() => (text, "Pasted from system clipboard"),
            Some(Ok(_)) => (
                internal,
                "Pasted from internal clipboard (system clipboard empty)",
            ),
            Some(Err(e)) => {
                tracing::warn!(target: "kiln::io", error = %e, "system clipboard paste failed");
                (
                    internal,
                    "Pasted from internal clipboard (system clipboard error)",
                )
            }
            None => (internal, "Pasted from internal clipboard"),
        }
    }

    fn copy(&mut self) {
        let Some(text) = self.selected_text() else {
            self.set_message("Nothing to copy");
            return;
        };
        let msg = self.store_clipboard(&text, "Copied");
        self.set_message(msg);
    }

    fn cut(&mut self) {
        let Some(text) = self.selected_text() else {
            self.set_message("Nothing to cut");
            return;
        };
        let msg = self.store_clipboard(&text, "Cut");
        let r = self.delete_selection().map(|_| ());
        self.report(r);
        if !self.message_is_error {
            self.set_message(msg);
        }
    }

    fn paste(&mut self) {
        let (raw, msg) = self.fetch_clipboard();
        if raw.is_empty() {
            self.set_message("Clipboard is empty");
            return;
        }
        let text = split_lines(&raw).join("\n");
        let r = self.delete_selection().and_then(|_| {
            let pos = self.cursor.cursor();
            self.insert_recorded(pos, &text).map(|_| ())
        });
        self.report(r);
        if !self.message_is_error {
            self.set_message(msg);
        }
    }

    // -- Search -------------------------------------------------------------

    fn key_hint(&self, action: Action) -> String {
        self.ctx
            .keymap
            .binding(action)
            .map(|k| k.to_string().to_uppercase())
            .unwrap_or_default()
    }

    fn find(&mut self, ui: &mut dyn Frontend) {
        let Some(term) = self.ask(ui, "Find: ").filter(|t| !t.is_empty()) else {
            self.search.clear();
            self.set_message("Search cancelled");
            return;
        };
        match self.search.search(&self.buffer, &term) {
            None => self.set_message(format!("'{term}' not found")),
            Some(first) => {
                self.cursor.clear_selection();
                self.cursor
                    .set_cursor(Position::new(first.row, first.start), &self.buffer);
                let n = self.search.matches().len();
                let hint = self.key_hint(Action::FindNext);
                if hint.is_empty() {
                    self.set_message(format!("Found {n} match(es)"));
                } else {
                    self.set_message(format!("Found {n} match(es). Press {hint} for next."));
                }
            }
        }
    }

    fn find_next(&mut self) {
        let Some((index, m)) = self.search.next_match() else {
            let hint = self.key_hint(Action::Find);
            self.set_message(format!(
                "No search results to cycle through. Use {hint} first."
            ));
            return;
        };
        self.cursor.clear_selection();
        self.cursor.set_cursor(Position::new(m.row, m.start), &self.buffer);
        self.set_message(format!("Match {index}/{}", self.search.matches().len()));
    }

    fn replace(&mut self, ui: &mut dyn Frontend) {
        let Some(pattern) = self
            .ask(ui, "Search for (regex): ")
            .filter(|p| !p.is_empty())
        else {
            self.set_message("Search cancelled");
            return;
        };
        let Some(replacement) = self.ask(ui, "Replace with: ") else {
            self.set_message("Replacement cancelled");
            return;
        };

        let replaced = match search::replace_all(&self.buffer.lines(), &pattern, &replacement) {
            Ok(r) => r,
            Err(e) => {
                tracing::info!(target: "kiln::dispatch", error = %e, "bad replace pattern");
                self.set_error(e.to_string());
                return;
            }
        };
        let Some(replaced) = replaced else {
            self.set_message("Replaced 0 occurrence(s)");
            return;
        };

        let keep = self.cursor.cursor();
        let r = self.rewrite_document(&replaced.lines.join("\n"));
        self.report(r);
        self.cursor.set_cursor(keep, &self.buffer);
        if !self.message_is_error {
            self.set_message(format!("Replaced {} occurrence(s)", replaced.count));
        }
    }

    /// Replace the whole text as one Delete plus one Insert, so two undo
    /// steps restore it.
    fn rewrite_document(&mut self, text: &str) -> Result<()> {
        let end = self.buffer.end();
        self.delete_recorded(Position::ZERO, end)?;
        self.insert_recorded(Position::ZERO, text)?;
        Ok(())
    }

    /// Columns of the bracket under the cursor and its partner, on the
    /// cursor row.
    #[must_use]
    pub fn bracket_pair(&self) -> Option<(usize, usize, usize)> {
        let pos = self.cursor.cursor();
        let line = self.buffer.line_at(pos.row).ok()?;
        let other = search::matching_bracket(&line, pos.col)?;
        Some((pos.row, pos.col, other))
    }

    // -- Navigation ---------------------------------------------------------

    fn goto_line(&mut self, ui: &mut dyn Frontend) {
        let Some(raw) = self
            .ask(ui, "Go to line (±N or %): ")
            .filter(|r| !r.trim().is_empty())
        else {
            self.set_message("Goto cancelled");
            return;
        };
        let count = self.buffer.line_count();
        let Some(target) = goto_target(raw.trim(), self.cursor.cursor().row, count) else {
            self.set_message("Invalid number");
            return;
        };
        if !(1..=i64::try_from(count).unwrap_or(i64::MAX)).contains(&target) {
            self.set_message(format!("Line out of range (1–{count})"));
            return;
        }
        let row = usize::try_from(target - 1).unwrap_or(0);
        self.cursor.clear_selection();
        self.cursor.set_cursor(Position::new(row, 0), &self.buffer);
        self.viewport.center_on(self.cursor.cursor(), &self.buffer);
        self.set_message(format!("Moved to line {target}"));
    }

    fn cancel(&mut self) {
        if self.cursor.has_selection() {
            self.cursor.clear_selection();
            self.set_message("Selection cancelled");
        } else if self.search.clear() {
            self.set_message("Search highlighting cancelled");
        } else {
            self.set_message("Operation cancelled");
        }
    }
}

/// 1-based target line for `N`, `+N` / `-N` (relative to `row`), or `N%`.
/// `None` when the input is not a number or the arithmetic overflows.
#[allow(clippy::cast_possible_wrap)]
fn goto_target(raw: &str, row: usize, count: usize) -> Option<i64> {
    let count = count as i64;
    if let Some(pct) = raw.strip_suffix('%') {
        let pct: i64 = pct.trim().parse().ok()?;
        let target = count.checked_mul(pct)?.checked_add(50)?.div_euclid(100);
        Some(target.clamp(1, count))
    } else if raw.starts_with('+') || raw.starts_with('-') {
        let delta: i64 = raw.parse().ok()?;
        (row as i64 + 1).checked_add(delta)
    } else {
        raw.parse().ok()
    }
}

fn leading_whitespace(line: &str) -> &str {
    let end = line
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(line.len(), |(i, _)| i);
    &line[..end]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
