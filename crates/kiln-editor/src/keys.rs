//! Key chords and key-string parsing.
//!
//! A [`KeyChord`] is a key plus modifiers, normalised so that the same
//! physical chord always compares equal no matter how the terminal spelled
//! it. Keybinding strings from the config (`"ctrl+s"`, `"ctrl+shift+z"`,
//! `"alt+x"`, `"f5"`, `"del"`) parse into the same type with [`parse_key`].
//!
//! # Key code layout
//!
//! [`KeyChord::code`] packs a chord into a `u32` used as the keymap key:
//!
//! ```text
//!  bit 27  26  25  24   23..21   20 ........................ 0
//!  ┌────┬────┬────┬────┬───────┬──────────────────────────────┐
//!  │SHFT│CTRL│ALT │C+S │   0   │ base                         │
//!  └────┴────┴────┴────┴───────┴──────────────────────────────┘
//! ```
//!
//! - base: the Unicode scalar for characters (fits in 21 bits). Ctrl+letter
//!   uses the ASCII control code (`ctrl+a` = 1 ... `ctrl+z` = 26). Named keys
//!   live in the private-use block at `0xE000`, F-keys at `0xE100 + n`, so
//!   they never collide with a real character.
//! - bit 24: Ctrl+Shift together.
//! - bit 25: Alt.
//! - bit 26: Ctrl on anything that has no control code (named keys, digits,
//!   punctuation).
//! - bit 27: Shift on named keys. For characters the case carries Shift.

use std::fmt;

use kiln_term::input::{KeyCode, KeyEvent, Modifiers};

use crate::error::{EditorError, Result};

pub const BASE_MASK: u32 = 0x001F_FFFF;
pub const CTRL_SHIFT_BIT: u32 = 1 << 24;
pub const ALT_BIT: u32 = 1 << 25;
pub const CTRL_BIT: u32 = 1 << 26;
pub const SHIFT_BIT: u32 = 1 << 27;

const NAMED_BASE: u32 = 0xE000;
const FKEY_BASE: u32 = 0xE100;

// ---------------------------------------------------------------------------
// KeyChord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub code: KeyCode,
    pub mods: Modifiers,
}

impl KeyChord {
    /// Build a normalised chord.
    ///
    /// - Super is dropped.
    /// - With Ctrl, letters are lowercased and an uppercase letter implies
    ///   Shift.
    /// - Without Ctrl, Shift on a character is dropped: the character
    ///   itself already says what was typed.
    #[must_use]
    pub fn new(code: KeyCode, mods: Modifiers) -> Self {
        let mut mods = mods - Modifiers::SUPER;
        let code = match code {
            KeyCode::Char(c) if mods.contains(Modifiers::CTRL) => {
                if c.is_ascii_uppercase() {
                    mods |= Modifiers::SHIFT;
                }
                KeyCode::Char(c.to_ascii_lowercase())
            }
            KeyCode::Char(c) => {
                mods -= Modifiers::SHIFT;
                KeyCode::Char(c)
            }
            other => other,
        };
        Self { code, mods }
    }

    #[must_use]
    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, Modifiers::empty())
    }

    /// The packed keymap code (see the module docs for the layout).
    #[must_use]
    pub fn code(self) -> u32 {
        let ctrl = self.mods.contains(Modifiers::CTRL);
        let shift = self.mods.contains(Modifiers::SHIFT);
        let mut bits = 0;

        let base = match self.code {
            KeyCode::Char(c) if ctrl && c.is_ascii_lowercase() => u32::from(c) - u32::from('a') + 1,
            KeyCode::Char(c) => {
                if ctrl && !shift {
                    bits |= CTRL_BIT;
                }
                u32::from(c)
            }
            KeyCode::F(n) => FKEY_BASE + u32::from(n),
            named => {
                if ctrl && !shift {
                    bits |= CTRL_BIT;
                }
                if shift && !ctrl {
                    bits |= SHIFT_BIT;
                }
                NAMED_BASE + named_index(named)
            }
        };

        if ctrl && shift {
            bits |= CTRL_SHIFT_BIT;
        }
        if self.mods.contains(Modifiers::ALT) {
            bits |= ALT_BIT;
        }
        (base & BASE_MASK) | bits
    }

    /// A character to insert, if this chord types one.
    #[must_use]
    pub fn printable(self) -> Option<char> {
        match self.code {
            KeyCode::Char(c)
                if !self.mods.intersects(Modifiers::CTRL | Modifiers::ALT) && !c.is_control() =>
            {
                Some(c)
            }
            _ => None,
        }
    }
}

impl From<KeyEvent> for KeyChord {
    fn from(ev: KeyEvent) -> Self {
        Self::new(ev.code, ev.modifiers)
    }
}

const fn named_index(code: KeyCode) -> u32 {
    match code {
        KeyCode::Enter => 1,
        KeyCode::Tab => 2,
        KeyCode::Backspace => 3,
        KeyCode::Escape => 4,
        KeyCode::Delete => 5,
        KeyCode::Insert => 6,
        KeyCode::Up => 7,
        KeyCode::Down => 8,
        KeyCode::Left => 9,
        KeyCode::Right => 10,
        KeyCode::Home => 11,
        KeyCode::End => 12,
        KeyCode::PageUp => 13,
        KeyCode::PageDown => 14,
        KeyCode::Char(_) | KeyCode::F(_) => 0,
    }
}

/// Canonical spelling, the same form [`parse_key`] accepts.
impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mods.contains(Modifiers::CTRL) {
            f.write_str("ctrl+")?;
        }
        if self.mods.contains(Modifiers::SHIFT) {
            f.write_str("shift+")?;
        }
        if self.mods.contains(Modifiers::ALT) {
            f.write_str("alt+")?;
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("space"),
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::F(n) => write!(f, "f{n}"),
            KeyCode::Enter => f.write_str("enter"),
            KeyCode::Tab => f.write_str("tab"),
            KeyCode::Backspace => f.write_str("backspace"),
            KeyCode::Escape => f.write_str("esc"),
            KeyCode::Delete => f.write_str("del"),
            KeyCode::Insert => f.write_str("insert"),
            KeyCode::Up => f.write_str("up"),
            KeyCode::Down => f.write_str("down"),
            KeyCode::Left => f.write_str("left"),
            KeyCode::Right => f.write_str("right"),
            KeyCode::Home => f.write_str("home"),
            KeyCode::End => f.write_str("end"),
            KeyCode::PageUp => f.write_str("pageup"),
            KeyCode::PageDown => f.write_str("pagedown"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn named_key(name: &str) -> Option<KeyCode> {
    let code = match name {
        "del" | "delete" => KeyCode::Delete,
        "backspace" => KeyCode::Backspace,
        "tab" => KeyCode::Tab,
        "enter" | "return" => KeyCode::Enter,
        "space" => KeyCode::Char(' '),
        "esc" | "escape" => KeyCode::Escape,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" | "pgup" => KeyCode::PageUp,
        "pagedown" | "pgdn" => KeyCode::PageDown,
        "insert" | "ins" => KeyCode::Insert,
        _ => {
            let n: u8 = name.strip_prefix('f')?.parse().ok()?;
            return (1..=35).contains(&n).then_some(KeyCode::F(n));
        }
    };
    Some(code)
}

/// Parse a keybinding string such as `"ctrl+shift+z"` or `"f3"`.
///
/// Case-insensitive. Modifiers (`ctrl`, `shift`, `alt`) come first in any
/// order, joined by `+`; the last part is a key name or a single
/// character. `shift+a` means `A`.
///
/// # Errors
///
/// [`EditorError::Config`] for an empty string, an unknown key name, an
/// unknown or repeated modifier, or Ctrl+Shift on anything but a letter.
pub fn parse_key(spec: &str) -> Result<KeyChord> {
    let invalid = |why: &str| EditorError::Config(format!("invalid key '{spec}': {why}"));

    let lowered = spec.trim().to_lowercase();
    if lowered.is_empty() {
        return Err(invalid("empty"));
    }

    // A trailing "+" is the plus key itself ("ctrl++").
    let (head, key) = match lowered.strip_suffix("++") {
        Some(head) => (head, "+"),
        None => lowered.rsplit_once('+').unwrap_or(("", lowered.as_str())),
    };
    if key.is_empty() {
        return Err(invalid("missing key"));
    }

    let mut mods = Modifiers::empty();
    for part in head.split('+').filter(|p| !p.is_empty()) {
        let m = match part {
            "ctrl" | "control" => Modifiers::CTRL,
            "shift" => Modifiers::SHIFT,
            "alt" | "meta" => Modifiers::ALT,
            other => return Err(invalid(&format!("unknown modifier '{other}'"))),
        };
        if mods.contains(m) {
            return Err(invalid(&format!("repeated modifier '{part}'")));
        }
        mods |= m;
    }

    let mut chars = key.chars();
    let code = match (chars.next(), chars.next()) {
        (Some(c), None) => {
            if mods == Modifiers::SHIFT || mods == Modifiers::SHIFT | Modifiers::ALT {
                mods -= Modifiers::SHIFT;
                KeyCode::Char(c.to_uppercase().next().unwrap_or(c))
            } else {
                KeyCode::Char(c)
            }
        }
        _ => named_key(key).ok_or_else(|| invalid(&format!("unknown key '{key}'")))?,
    };

    if mods.contains(Modifiers::CTRL | Modifiers::SHIFT)
        && !matches!(code, KeyCode::Char(c) if c.is_ascii_alphabetic())
    {
        return Err(invalid("ctrl+shift needs a letter"));
    }

    Ok(KeyChord::new(code, mods))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
