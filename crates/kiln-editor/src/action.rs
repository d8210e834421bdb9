//! Editor actions and the keymap that selects them.
//!
//! [`Action`] is the closed set of things a key can do. The dispatcher
//! matches on it exhaustively. [`Keymap`] maps packed key codes
//! ([`KeyChord::code`]) to actions: a fixed layer for cursor keys and
//! editing keys, then the configurable bindings on top.

use std::collections::{BTreeMap, HashMap};

use kiln_term::input::{KeyCode, Modifiers};

use crate::cursor::Motion;
use crate::keys::{KeyChord, parse_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Move(Motion),
    /// Move while extending the selection.
    Extend(Motion),
    InsertChar(char),
    Newline,
    Backspace,
    Delete,
    Tab,
    ToggleInsertMode,
    NewFile,
    OpenFile,
    SaveFile,
    SaveAs,
    Revert,
    Quit,
    Undo,
    Redo,
    SelectAll,
    Copy,
    Cut,
    Paste,
    GotoLine,
    Find,
    FindNext,
    Replace,
    Cancel,
    GitMenu,
    Help,
    RunCommand,
    ToggleAutosave,
}

/// Configurable actions: config name, action, default key, help text.
pub const BINDABLE: &[(&str, Action, &str, &str)] = &[
    ("help", Action::Help, "f1", "Help"),
    ("git_menu", Action::GitMenu, "f2", "Git menu"),
    ("find_next", Action::FindNext, "f3", "Find next"),
    ("new_file", Action::NewFile, "f4", "New file"),
    ("save_as", Action::SaveAs, "f5", "Save as"),
    ("revert", Action::Revert, "f6", "Revert to saved"),
    ("toggle_autosave", Action::ToggleAutosave, "f7", "Toggle auto-save"),
    ("run_command", Action::RunCommand, "f8", "Run command"),
    ("open_file", Action::OpenFile, "ctrl+o", "Open"),
    ("save_file", Action::SaveFile, "ctrl+s", "Save"),
    ("quit", Action::Quit, "ctrl+q", "Quit"),
    ("undo", Action::Undo, "ctrl+z", "Undo"),
    ("redo", Action::Redo, "ctrl+shift+z", "Redo"),
    ("select_all", Action::SelectAll, "ctrl+a", "Select all"),
    ("copy", Action::Copy, "ctrl+c", "Copy"),
    ("cut", Action::Cut, "ctrl+x", "Cut"),
    ("paste", Action::Paste, "ctrl+v", "Paste"),
    ("find", Action::Find, "ctrl+f", "Find"),
    ("replace", Action::Replace, "ctrl+r", "Replace (regex)"),
    ("goto_line", Action::GotoLine, "ctrl+g", "Go to line"),
    ("delete", Action::Delete, "del", "Delete"),
    ("toggle_insert", Action::ToggleInsertMode, "insert", "Insert / overwrite"),
    ("cancel", Action::Cancel, "esc", "Cancel"),
];

impl Action {
    /// Look up a configurable action by its config name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        // Older configs spell it the long way.
        let name = if name == "cancel_operation" { "cancel" } else { name };
        BINDABLE
            .iter()
            .find(|(n, ..)| *n == name)
            .map(|&(_, action, ..)| action)
    }

    /// Whether running this action can change the document.
    #[must_use]
    pub const fn is_edit(self) -> bool {
        matches!(
            self,
            Self::InsertChar(_)
                | Self::Newline
                | Self::Backspace
                | Self::Delete
                | Self::Tab
                | Self::Cut
                | Self::Paste
                | Self::Undo
                | Self::Redo
                | Self::Replace
        )
    }
}

// ---------------------------------------------------------------------------
// Keymap
// ---------------------------------------------------------------------------

fn fixed_layer() -> Vec<(KeyChord, Action)> {
    let plain = KeyChord::plain;
    let shift = |code| KeyChord::new(code, Modifiers::SHIFT);
    let motions = [
        (KeyCode::Up, Motion::Up),
        (KeyCode::Down, Motion::Down),
        (KeyCode::Left, Motion::Left),
        (KeyCode::Right, Motion::Right),
        (KeyCode::Home, Motion::Home),
        (KeyCode::End, Motion::End),
        (KeyCode::PageUp, Motion::PageUp),
        (KeyCode::PageDown, Motion::PageDown),
    ];

    let mut layer = vec![
        (plain(KeyCode::Enter), Action::Newline),
        (plain(KeyCode::Backspace), Action::Backspace),
        (plain(KeyCode::Tab), Action::Tab),
    ];
    for (code, motion) in motions {
        layer.push((plain(code), Action::Move(motion)));
        layer.push((shift(code), Action::Extend(motion)));
    }
    layer
}

#[derive(Debug, Clone)]
pub struct Keymap {
    map: HashMap<u32, Action>,
    /// Effective chord per configurable action, for the help screen.
    bound: Vec<(Action, KeyChord)>,
}

impl Keymap {
    /// The built-in bindings.
    #[must_use]
    pub fn defaults() -> Self {
        Self::from_bindings(&BTreeMap::new())
    }

    /// Build from `[keybindings]`. Unknown action names are ignored and an
    /// unparsable key string falls back to that action's default; both are
    /// logged.
    #[must_use]
    pub fn from_bindings(bindings: &BTreeMap<String, String>) -> Self {
        for name in bindings.keys() {
            if Action::from_name(name).is_none() {
                tracing::warn!(target: "kiln::keys", action = %name, "unknown action in keybindings");
            }
        }

        let mut map: HashMap<u32, Action> =
            fixed_layer().into_iter().map(|(k, a)| (k.code(), a)).collect();
        let mut bound = Vec::with_capacity(BINDABLE.len());

        for &(name, action, default, _) in BINDABLE {
            let configured = bindings
                .get(name)
                .or_else(|| (name == "cancel").then(|| bindings.get("cancel_operation")).flatten());
            let chord = match configured.map(String::as_str).map(parse_key) {
                Some(Ok(chord)) => chord,
                Some(Err(e)) => {
                    tracing::warn!(target: "kiln::keys", action = name, error = %e, fallback = default, "bad keybinding");
                    default_chord(default)
                }
                None => default_chord(default),
            };
            if let Some(prev) = map.insert(chord.code(), action) {
                if prev != action {
                    tracing::debug!(target: "kiln::keys", key = %chord, ?prev, ?action, "binding overrides");
                }
            }
            bound.push((action, chord));
        }

        Self { map, bound }
    }

    /// The action for a key, falling back to inserting printable
    /// characters.
    #[must_use]
    pub fn lookup(&self, chord: KeyChord) -> Option<Action> {
        self.map
            .get(&chord.code())
            .copied()
            .or_else(|| chord.printable().map(Action::InsertChar))
    }

    #[must_use]
    pub fn binding(&self, action: Action) -> Option<KeyChord> {
        self.bound
            .iter()
            .find(|(a, _)| *a == action)
            .map(|&(_, chord)| chord)
    }

    /// `(key, description)` lines for the help screen, in table order.
    #[must_use]
    pub fn help_lines(&self) -> Vec<(String, &'static str)> {
        BINDABLE
            .iter()
            .filter_map(|&(_, action, _, help)| {
                self.binding(action).map(|chord| (chord.to_string(), help))
            })
            .collect()
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Default key strings are constants and always parse.
fn default_chord(spec: &str) -> KeyChord {
    parse_key(spec).unwrap_or_else(|_| KeyChord::plain(KeyCode::Escape))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chord(s: &str) -> KeyChord {
        parse_key(s).unwrap()
    }

    fn bindings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(a, k)| ((*a).to_string(), (*k).to_string()))
            .collect()
    }

    #[test]
    fn every_default_parses() {
        for &(name, _, key, _) in BINDABLE {
            assert!(parse_key(key).is_ok(), "{name}: {key}");
        }
    }

    #[test]
    fn defaults_dispatch() {
        let km = Keymap::defaults();
        assert_eq!(km.lookup(chord("ctrl+s")), Some(Action::SaveFile));
        assert_eq!(km.lookup(chord("ctrl+z")), Some(Action::Undo));
        assert_eq!(km.lookup(chord("ctrl+shift+z")), Some(Action::Redo));
        assert_eq!(km.lookup(chord("f1")), Some(Action::Help));
        assert_eq!(km.lookup(chord("esc")), Some(Action::Cancel));
        assert_eq!(km.lookup(chord("shift+left")), Some(Action::Extend(Motion::Left)));
        assert_eq!(km.lookup(chord("pgdn")), Some(Action::Move(Motion::PageDown)));
    }

    #[test]
    fn printable_keys_insert() {
        let km = Keymap::defaults();
        assert_eq!(km.lookup(chord("q")), Some(Action::InsertChar('q')));
        assert_eq!(km.lookup(chord("shift+q")), Some(Action::InsertChar('Q')));
        assert_eq!(km.lookup(chord("alt+q")), None);
    }

    #[test]
    fn config_overrides_default() {
        let km = Keymap::from_bindings(&bindings(&[("quit", "ctrl+w")]));
        assert_eq!(km.lookup(chord("ctrl+w")), Some(Action::Quit));
        assert_eq!(km.lookup(chord("ctrl+q")), None);
        assert_eq!(km.binding(Action::Quit), Some(chord("ctrl+w")));
    }

    #[test]
    fn bad_binding_falls_back_to_default() {
        let km = Keymap::from_bindings(&bindings(&[("copy", "ctrl+shift+!"), ("bogus", "f9")]));
        assert_eq!(km.lookup(chord("ctrl+c")), Some(Action::Copy));
        assert_eq!(km.lookup(chord("f9")), None);
    }

    #[test]
    fn legacy_cancel_name() {
        let km = Keymap::from_bindings(&bindings(&[("cancel_operation", "f12")]));
        assert_eq!(km.lookup(chord("f12")), Some(Action::Cancel));
    }

    #[test]
    fn help_lists_effective_keys() {
        let km = Keymap::from_bindings(&bindings(&[("find", "f9")]));
        let lines = km.help_lines();
        assert!(lines.contains(&("f9".to_string(), "Find")));
        assert_eq!(lines.len(), BINDABLE.len());
    }
}
