//! Opening, saving, reverting, and autosave.
//!
//! A document remembers the encoding it was read in and is written back in
//! it, lines joined with the platform separator. Filenames typed at a prompt
//! must stay inside the working directory.
//!
//! Autosave is driven by the bridge: the timer thread only posts a request,
//! and [`Editor::autosave`] runs here on the UI thread when it is drained.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::bridge::AutosaveTimer;
use crate::editor::Editor;
use crate::encoding::{self, LINE_SEPARATOR, TextEncoding};
use crate::error::{EditorError, Result};
use crate::highlight::tokenizer_for;
use crate::ports::Frontend;

/// Longest filename accepted at a prompt, in chars.
pub const MAX_FILENAME: usize = 255;

/// Check a typed filename: non-empty, not too long, and resolving inside
/// the working directory. `..` components are resolved lexically, so the
/// file does not have to exist.
///
/// # Errors
///
/// [`EditorError::InvalidFilename`] when any check fails.
pub fn validate_filename(name: &str) -> Result<PathBuf> {
    let invalid = || EditorError::InvalidFilename(name.to_string());
    if name.is_empty() || name.chars().count() > MAX_FILENAME {
        return Err(invalid());
    }
    let cwd = std::env::current_dir().map_err(|_| invalid())?;
    let resolved = normalize(&cwd.join(name));
    if resolved.starts_with(&cwd) {
        Ok(PathBuf::from(name))
    } else {
        Err(invalid())
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for part in path.components() {
        match part {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Write `lines` to `path` in `encoding`. Refuses directories and
/// read-only files up front so the error names the real problem.
///
/// # Errors
///
/// [`EditorError::Io`] with kind `IsADirectory`, `PermissionDenied`, or
/// whatever the write itself failed with.
pub fn write_lines(path: &Path, lines: &[String], encoding: TextEncoding) -> Result<()> {
    if path.is_dir() {
        return Err(EditorError::io(path, io::ErrorKind::IsADirectory.into()));
    }
    if fs::metadata(path).is_ok_and(|m| m.permissions().readonly()) {
        return Err(EditorError::io(path, io::ErrorKind::PermissionDenied.into()));
    }
    let bytes = encoding::encode(&lines.join(LINE_SEPARATOR), encoding);
    fs::write(path, &bytes).map_err(|e| EditorError::io(path, e))?;
    tracing::info!(target: "kiln::io", path = %path.display(), bytes = bytes.len(), %encoding, "saved");
    Ok(())
}

fn save_failure(path: &Path, err: &EditorError) -> String {
    let name = path.display();
    match err {
        EditorError::Io { source, .. } if source.kind() == io::ErrorKind::IsADirectory => {
            format!("Cannot save: {name} is a directory")
        }
        EditorError::Io { source, .. } if source.kind() == io::ErrorKind::PermissionDenied => {
            format!("No write permissions: {name}")
        }
        EditorError::Io { source, .. } => format!("Error saving file: {source}"),
        other => format!("Error saving file: {other}"),
    }
}

impl Editor {
    /// Name for messages and the status line.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| "[No Name]".to_string(), |p| p.display().to_string())
    }

    /// Replace the document with `text` and reset everything that referred
    /// to the old one: cursor, selection, viewport, history, search.
    pub fn load_text(&mut self, text: &str) {
        self.buffer.replace_all(text);
        self.cursor.reset();
        self.viewport.reset();
        self.history.clear();
        self.search.clear();
    }

    fn set_path(&mut self, path: Option<PathBuf>) {
        self.language = self.ctx.language_for(path.as_deref());
        self.highlighter.set_tokenizer(tokenizer_for(&self.language));
        self.path = path;
    }

    /// Read `path` into the editor.
    ///
    /// # Errors
    ///
    /// [`EditorError::Io`] when the file cannot be read; the current
    /// document is left as it was.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let bytes = fs::read(path).map_err(|e| EditorError::io(path, e))?;
        let decoded = encoding::decode(&bytes);
        if decoded.lossy {
            let err = EditorError::Encoding(format!(
                "{} is not valid {}; invalid bytes were replaced",
                path.display(),
                decoded.encoding
            ));
            tracing::warn!(target: "kiln::io", error = %err, "lossy decode");
        }
        self.load_text(&decoded.text);
        self.encoding = decoded.encoding;
        self.set_path(Some(path.to_path_buf()));
        tracing::info!(
            target: "kiln::io",
            path = %path.display(),
            lines = self.buffer.line_count(),
            encoding = %self.encoding,
            "opened"
        );
        self.refresh_vcs();
        Ok(())
    }

    /// Startup file argument: open it, or start a new document with that
    /// name when it does not exist yet.
    pub fn open_initial(&mut self, path: &Path) {
        if path.exists() {
            match self.load_file(path) {
                Ok(()) => self.set_message(format!("Opened {} (enc: {})", path.display(), self.encoding)),
                Err(e) => {
                    tracing::error!(target: "kiln::io", error = %e, "initial open failed");
                    self.set_error(format!("Error opening file: {e}"));
                }
            }
        } else {
            self.set_path(Some(path.to_path_buf()));
            self.refresh_vcs();
            self.set_message(format!("New file: {}", path.display()));
        }
    }

    /// Offer to save unsaved changes before the document is replaced.
    /// `false` when the user asked to save and the save did not happen; the
    /// save has already set the message explaining why.
    pub(crate) fn offer_save(&mut self, ui: &mut dyn Frontend) -> bool {
        if self.buffer.is_modified() && self.ask_yes(ui, "Save changes? (y/n): ") {
            self.save_file(ui);
            return !self.buffer.is_modified();
        }
        true
    }

    pub(crate) fn open_file(&mut self, ui: &mut dyn Frontend) {
        if !self.offer_save(ui) {
            return;
        }
        let Some(name) = self.ask(ui, "Open file: ").filter(|n| !n.is_empty()) else {
            self.set_message("Open cancelled");
            return;
        };
        let Ok(path) = validate_filename(&name) else {
            self.set_error("Invalid filename");
            return;
        };
        match self.load_file(&path) {
            Ok(()) => self.set_message(format!("Opened {name} (enc: {})", self.encoding)),
            Err(EditorError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                self.set_error(format!("File not found: {name}"));
            }
            Err(e) => {
                tracing::error!(target: "kiln::io", error = %e, "open failed");
                self.set_error(format!("Error opening file: {e}"));
            }
        }
    }

    /// Ask for a filename; `None` (with the message set) on cancel or an
    /// invalid answer.
    fn ask_filename(&mut self, ui: &mut dyn Frontend, label: &str) -> Option<PathBuf> {
        let Some(name) = self.ask(ui, label).filter(|n| !n.is_empty()) else {
            self.set_message("Save cancelled");
            return None;
        };
        match validate_filename(&name) {
            Ok(path) => Some(path),
            Err(_) => {
                self.set_error("Invalid filename");
                None
            }
        }
    }

    /// Write the document to `path`. On success the path is adopted, the
    /// modified flag cleared, and the lint and VCS workers started.
    fn save_to(&mut self, path: PathBuf) -> bool {
        if let Err(e) = write_lines(&path, &self.buffer.lines(), self.encoding) {
            tracing::warn!(target: "kiln::io", error = %e, "save failed");
            self.set_error(save_failure(&path, &e));
            return false;
        }
        if self.path.as_ref() != Some(&path) {
            self.set_path(Some(path));
        }
        self.buffer.mark_saved();
        self.spawn_lint();
        self.refresh_vcs();
        true
    }

    pub(crate) fn save_file(&mut self, ui: &mut dyn Frontend) {
        let path = match self.path.clone() {
            Some(path) => path,
            None => match self.ask_filename(ui, "Save as: ") {
                Some(path) => path,
                None => return,
            },
        };
        if self.save_to(path) {
            self.set_message(format!("Saved to {}", self.display_name()));
        }
    }

    pub(crate) fn save_file_as(&mut self, ui: &mut dyn Frontend) {
        let Some(path) = self.ask_filename(ui, "Save file as: ") else {
            return;
        };
        if self.save_to(path) {
            self.set_message(format!("Saved as {}", self.display_name()));
        }
    }

    pub(crate) fn revert(&mut self, ui: &mut dyn Frontend) {
        let Some(path) = self.path.clone() else {
            self.set_message("Cannot revert: file has not been saved yet");
            return;
        };
        if !path.exists() {
            self.set_error(format!("Cannot revert: file {} does not exist", path.display()));
            return;
        }
        if !self.ask_yes(ui, "Revert to last saved version? (y/n): ") {
            self.set_message("Revert cancelled");
            return;
        }
        match self.load_file(&path) {
            Ok(()) => self.set_message(format!(
                "Reverted to last saved version of {}",
                path.display()
            )),
            Err(e) => {
                tracing::error!(target: "kiln::io", error = %e, "revert failed");
                self.set_error(format!("Error reverting file: {e}"));
            }
        }
    }

    pub(crate) fn new_file(&mut self, ui: &mut dyn Frontend) {
        if !self.offer_save(ui) {
            return;
        }
        self.load_text("");
        self.encoding = TextEncoding::default();
        self.set_path(None);
        self.set_message("New file created");
    }

    // -- Autosave -----------------------------------------------------------

    pub(crate) fn toggle_autosave(&mut self) {
        if let Some(mut timer) = self.autosave.take() {
            timer.stop();
            self.set_message("Auto-save disabled");
            return;
        }
        match AutosaveTimer::start(self.ctx.settings().autosave_interval(), self.bridge.sender()) {
            Ok(timer) => {
                self.autosave = Some(timer);
                self.set_message("Auto-save enabled");
            }
            Err(e) => {
                tracing::error!(target: "kiln::worker", error = %e, "autosave timer failed to start");
                self.set_error(format!("Auto-save error: {e}"));
            }
        }
    }

    pub(crate) fn stop_autosave(&mut self) {
        if let Some(mut timer) = self.autosave.take() {
            timer.stop();
        }
    }

    /// Serve an autosave request: save if the document is named and dirty.
    pub(crate) fn autosave(&mut self) {
        if !self.buffer.is_modified() {
            return;
        }
        let Some(path) = self.path.clone() else {
            tracing::debug!(target: "kiln::io", "autosave skipped: document has no name");
            return;
        };
        match write_lines(&path, &self.buffer.lines(), self.encoding) {
            Ok(()) => {
                self.buffer.mark_saved();
                self.set_message(format!("Auto-saved to {}", path.display()));
            }
            Err(e) => {
                tracing::warn!(target: "kiln::io", error = %e, "autosave failed");
                self.set_error(format!("Auto-save error: {e}"));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
