//! Interactive state and typing mode.
//!
//! The editor is always in exactly one [`EditorState`]:
//!
//! | State                    | Entered by                    | Left by                    |
//! |--------------------------|-------------------------------|----------------------------|
//! | `Editing`                | default                       |                            |
//! | `Selecting`              | shift+motion, select all      | plain motion, Esc, an edit |
//! | `Prompting`              | open, find, goto, commands    | Enter or Esc               |
//! | `HelpOverlay`            | help                          | Esc only                   |
//! | `ExternalCommandRunning` | run command                   | child exits or times out   |
//!
//! `Selecting` is not stored separately: it is `Editing` with a selection,
//! so the two can never disagree. [`EditorState::derive`] folds that in.
//!
//! [`InsertMode`] is orthogonal: how printable characters land.

use std::fmt;

/// What the UI loop is doing right now.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorState {
    #[default]
    Editing,
    Selecting,
    Prompting,
    HelpOverlay,
    ExternalCommandRunning,
}

impl EditorState {
    /// `Editing` becomes `Selecting` while a selection exists. Modal states
    /// are reported as they are.
    #[must_use]
    pub const fn derive(self, has_selection: bool) -> Self {
        match self {
            Self::Editing | Self::Selecting if has_selection => Self::Selecting,
            Self::Editing | Self::Selecting => Self::Editing,
            other => other,
        }
    }

    /// Keys go to the document (as opposed to a modal loop).
    #[inline]
    #[must_use]
    pub const fn is_editing(self) -> bool {
        matches!(self, Self::Editing | Self::Selecting)
    }
}

impl fmt::Display for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Editing => "editing",
            Self::Selecting => "selecting",
            Self::Prompting => "prompting",
            Self::HelpOverlay => "help",
            Self::ExternalCommandRunning => "running command",
        })
    }
}

/// Insert pushes text right; overwrite replaces the char under the cursor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertMode {
    #[default]
    Insert,
    Overwrite,
}

impl InsertMode {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Insert => Self::Overwrite,
            Self::Overwrite => Self::Insert,
        }
    }

    /// Status line tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Insert => "INS",
            Self::Overwrite => "OVR",
        }
    }

    /// Name used in the mode-change message.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Insert => "Insert",
            Self::Overwrite => "Replace",
        }
    }
}

impl fmt::Display for InsertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selecting_follows_the_selection() {
        assert_eq!(EditorState::Editing.derive(true), EditorState::Selecting);
        assert_eq!(EditorState::Selecting.derive(false), EditorState::Editing);
        assert_eq!(EditorState::Editing.derive(false), EditorState::Editing);
    }

    #[test]
    fn modal_states_ignore_the_selection() {
        for s in [
            EditorState::Prompting,
            EditorState::HelpOverlay,
            EditorState::ExternalCommandRunning,
        ] {
            assert_eq!(s.derive(true), s);
            assert!(!s.is_editing());
        }
    }

    #[test]
    fn insert_mode_toggles() {
        assert_eq!(InsertMode::default(), InsertMode::Insert);
        assert_eq!(InsertMode::Insert.toggled(), InsertMode::Overwrite);
        assert_eq!(InsertMode::Overwrite.toggled().tag(), "INS");
        assert_eq!(format!("{}", InsertMode::Overwrite), "OVR");
    }
}
