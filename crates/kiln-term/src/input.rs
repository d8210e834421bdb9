// SPDX-License-Identifier: MIT
//
// Terminal key input parser.
//
// Turns raw stdin bytes into `KeyEvent`s. Understands what the terminal
// sends once `Terminal::enter` has run:
//
// - control bytes and plain / UTF-8 printable characters
// - legacy CSI sequences (arrows, editing keys, F5–F12, xterm modifiers)
// - SS3 sequences (F1–F4 and arrows on some terminals)
// - Kitty keyboard protocol `CSI codepoint ; mods u` (disambiguate flag)
// - Alt+key as ESC followed by the key
//
// Escape sequences can be split across reads, so the parser keeps the
// unconsumed tail between `advance` calls. A lone ESC is ambiguous until
// more bytes arrive or the caller gives up waiting and calls `flush`.

use bitflags::bitflags;

// ─── Key Types ───────────────────────────────────────────────────────────────

/// A key press with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[inline]
    #[must_use]
    pub const fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    #[inline]
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }
}

/// Identity of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A printable character.
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    Insert,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// F1 through F35.
    F(u8),
}

bitflags! {
    /// Modifier flags, laid out like the xterm/Kitty modifier bitmask
    /// (`param = 1 + bits`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const SUPER = 0b1000;
    }
}

// ─── Parser ──────────────────────────────────────────────────────────────────

/// Incremental byte-to-key parser.
#[derive(Debug, Default)]
pub struct Parser {
    buf: Vec<u8>,
}

/// Outcome of parsing at one position.
enum Parsed {
    Key(KeyEvent, usize),
    Incomplete,
    Skip(usize),
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(64),
        }
    }

    /// Feed bytes and return every key that is now complete.
    pub fn advance(&mut self, data: &[u8]) -> Vec<KeyEvent> {
        self.buf.extend_from_slice(data);
        let mut keys = Vec::new();
        let mut pos = 0;

        while pos < self.buf.len() {
            match parse_one(&self.buf[pos..]) {
                Parsed::Key(key, used) => {
                    keys.push(key);
                    pos += used;
                }
                Parsed::Incomplete => break,
                Parsed::Skip(n) => pos += n,
            }
        }

        self.buf.drain(..pos);
        keys
    }

    /// True when bytes are waiting for the rest of a sequence.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Give up on pending bytes and emit them as literal keys. A pending
    /// lone ESC becomes the Escape key.
    pub fn flush(&mut self) -> Vec<KeyEvent> {
        let keys = self
            .buf
            .iter()
            .filter_map(|&b| match b {
                0x1B => Some(KeyEvent::plain(KeyCode::Escape)),
                0x7F => Some(KeyEvent::plain(KeyCode::Backspace)),
                b @ 0x01..=0x1A => Some(ctrl(b)),
                b @ 0x20..=0x7E => Some(KeyEvent::plain(KeyCode::Char(b as char))),
                _ => None,
            })
            .collect();
        self.buf.clear();
        keys
    }
}

// ─── Stateless parsing ───────────────────────────────────────────────────────

fn parse_one(buf: &[u8]) -> Parsed {
    match buf[0] {
        0x1B => parse_escape(buf),
        0x00 => Parsed::Key(
            KeyEvent::new(KeyCode::Char(' '), Modifiers::CTRL),
            1,
        ),
        0x08 | 0x7F => Parsed::Key(KeyEvent::plain(KeyCode::Backspace), 1),
        0x09 => Parsed::Key(KeyEvent::plain(KeyCode::Tab), 1),
        0x0A | 0x0D => Parsed::Key(KeyEvent::plain(KeyCode::Enter), 1),
        b @ 0x01..=0x1A => Parsed::Key(ctrl(b), 1),
        b @ 0x20..=0x7E => Parsed::Key(KeyEvent::plain(KeyCode::Char(b as char)), 1),
        0xC0..=0xF7 => parse_utf8(buf),
        _ => Parsed::Skip(1),
    }
}

/// Ctrl+letter from its control byte (0x01 = Ctrl+A).
const fn ctrl(b: u8) -> KeyEvent {
    KeyEvent::new(KeyCode::Char((b + b'a' - 1) as char), Modifiers::CTRL)
}

fn parse_escape(buf: &[u8]) -> Parsed {
    let Some(&next) = buf.get(1) else {
        return Parsed::Incomplete;
    };
    match next {
        b'[' => parse_csi(buf),
        b'O' => parse_ss3(buf),
        b @ 0x20..=0x7E => Parsed::Key(KeyEvent::new(KeyCode::Char(b as char), Modifiers::ALT), 2),
        b @ 0x01..=0x1A => {
            let mut key = ctrl(b);
            key.modifiers |= Modifiers::ALT;
            Parsed::Key(key, 2)
        }
        _ => Parsed::Key(KeyEvent::plain(KeyCode::Escape), 1),
    }
}

fn parse_csi(buf: &[u8]) -> Parsed {
    // Final byte is 0x40..=0x7E; parameters and intermediates are 0x20..=0x3F.
    let mut end = 2;
    while end < buf.len() {
        let b = buf[end];
        if (0x40..=0x7E).contains(&b) {
            break;
        }
        if !(0x20..=0x3F).contains(&b) {
            return Parsed::Skip(end + 1);
        }
        end += 1;
    }
    if end >= buf.len() {
        return Parsed::Incomplete;
    }

    let params = parse_params(&buf[2..end]);
    let used = end + 1;
    let mods = params.get(1).map_or(Modifiers::empty(), |p| decode_modifiers(*p));

    let code = match buf[end] {
        b'~' => match params.first().copied().unwrap_or(0) {
            1 | 7 => KeyCode::Home,
            2 => KeyCode::Insert,
            3 => KeyCode::Delete,
            4 | 8 => KeyCode::End,
            5 => KeyCode::PageUp,
            6 => KeyCode::PageDown,
            11..=15 => KeyCode::F(fkey(params[0], 11, 1)),
            17..=21 => KeyCode::F(fkey(params[0], 17, 6)),
            23 | 24 => KeyCode::F(fkey(params[0], 23, 11)),
            _ => return Parsed::Skip(used),
        },
        b'u' => return parse_kitty(&params, used),
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'P' => KeyCode::F(1),
        b'Q' => KeyCode::F(2),
        b'R' => KeyCode::F(3),
        b'S' => KeyCode::F(4),
        b'Z' => return Parsed::Key(KeyEvent::new(KeyCode::Tab, Modifiers::SHIFT), used),
        _ => return Parsed::Skip(used),
    };
    Parsed::Key(KeyEvent::new(code, mods), used)
}

/// Map a contiguous `CSI n ~` run onto F-key numbers.
#[allow(clippy::cast_possible_truncation)]
const fn fkey(param: u16, first_param: u16, first_key: u8) -> u8 {
    first_key + (param - first_param) as u8
}

fn parse_ss3(buf: &[u8]) -> Parsed {
    let Some(&b) = buf.get(2) else {
        return Parsed::Incomplete;
    };
    let code = match b {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'P' => KeyCode::F(1),
        b'Q' => KeyCode::F(2),
        b'R' => KeyCode::F(3),
        b'S' => KeyCode::F(4),
        _ => return Parsed::Skip(3),
    };
    Parsed::Key(KeyEvent::plain(code), 3)
}

/// `CSI codepoint [; modifiers[:event]] u`. Release events are dropped.
fn parse_kitty(params: &[u16], used: usize) -> Parsed {
    let mods = params.get(1).map_or(Modifiers::empty(), |p| decode_modifiers(*p));
    let code = match params.first().copied().unwrap_or(0) {
        27 | 57344 => KeyCode::Escape,
        13 | 57345 => KeyCode::Enter,
        9 | 57346 => KeyCode::Tab,
        127 | 57347 => KeyCode::Backspace,
        57348 => KeyCode::Insert,
        57349 => KeyCode::Delete,
        57350 => KeyCode::Left,
        57351 => KeyCode::Right,
        57352 => KeyCode::Up,
        57353 => KeyCode::Down,
        57354 => KeyCode::PageUp,
        57355 => KeyCode::PageDown,
        57356 => KeyCode::Home,
        57357 => KeyCode::End,
        #[allow(clippy::cast_possible_truncation)]
        cp @ 57364..=57398 => KeyCode::F((cp - 57363) as u8),
        cp => match char::from_u32(u32::from(cp)) {
            Some(ch) if !ch.is_control() => KeyCode::Char(ch),
            _ => return Parsed::Skip(used),
        },
    };
    Parsed::Key(KeyEvent::new(code, mods), used)
}

fn parse_utf8(buf: &[u8]) -> Parsed {
    let len = match buf[0] {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    };
    if buf.len() < len {
        return Parsed::Incomplete;
    }
    std::str::from_utf8(&buf[..len])
        .ok()
        .and_then(|s| s.chars().next())
        .map_or(Parsed::Skip(1), |ch| {
            Parsed::Key(KeyEvent::plain(KeyCode::Char(ch)), len)
        })
}

/// Semicolon-separated numeric parameters. Kitty's `mods:event` colon
/// sub-parameter is discarded.
fn parse_params(raw: &[u8]) -> Vec<u16> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(|&b| b == b';')
        .map(|field| {
            field
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .fold(0u16, |acc, b| {
                    acc.saturating_mul(10).saturating_add(u16::from(b - b'0'))
                })
        })
        .collect()
}

/// `1 + bits` encoding shared by xterm and Kitty. Only the low four bits
/// are kept.
#[allow(clippy::cast_possible_truncation)]
const fn decode_modifiers(param: u16) -> Modifiers {
    let bits = if param > 0 { param - 1 } else { 0 };
    Modifiers::from_bits_truncate(bits as u8)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(data: &[u8]) -> Vec<KeyEvent> {
        Parser::new().advance(data)
    }

    fn one(data: &[u8]) -> KeyEvent {
        let keys = parse(data);
        assert_eq!(keys.len(), 1, "expected one key from {data:?}, got {keys:?}");
        keys[0]
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::plain(code)
    }

    fn key_mod(code: KeyCode, m: Modifiers) -> KeyEvent {
        KeyEvent::new(code, m)
    }

    // -- Plain bytes ----------------------------------------------------------

    #[test]
    fn ascii_chars() {
        assert_eq!(
            parse(b"ab"),
            vec![key(KeyCode::Char('a')), key(KeyCode::Char('b'))]
        );
    }

    #[test]
    fn control_bytes() {
        assert_eq!(one(b"\x01"), key_mod(KeyCode::Char('a'), Modifiers::CTRL));
        assert_eq!(one(b"\x1a"), key_mod(KeyCode::Char('z'), Modifiers::CTRL));
        assert_eq!(one(b"\r"), key(KeyCode::Enter));
        assert_eq!(one(b"\t"), key(KeyCode::Tab));
        assert_eq!(one(b"\x7f"), key(KeyCode::Backspace));
    }

    #[test]
    fn utf8_char() {
        assert_eq!(one("é".as_bytes()), key(KeyCode::Char('é')));
        assert_eq!(one("中".as_bytes()), key(KeyCode::Char('中')));
    }

    #[test]
    fn utf8_split_across_reads() {
        let mut p = Parser::new();
        let bytes = "中".as_bytes();
        assert!(p.advance(&bytes[..1]).is_empty());
        assert_eq!(p.advance(&bytes[1..]), vec![key(KeyCode::Char('中'))]);
    }

    // -- CSI ------------------------------------------------------------------

    #[test]
    fn arrows_and_navigation() {
        assert_eq!(one(b"\x1b[A"), key(KeyCode::Up));
        assert_eq!(one(b"\x1b[D"), key(KeyCode::Left));
        assert_eq!(one(b"\x1b[H"), key(KeyCode::Home));
        assert_eq!(one(b"\x1b[4~"), key(KeyCode::End));
        assert_eq!(one(b"\x1b[5~"), key(KeyCode::PageUp));
        assert_eq!(one(b"\x1b[3~"), key(KeyCode::Delete));
        assert_eq!(one(b"\x1b[2~"), key(KeyCode::Insert));
    }

    #[test]
    fn shifted_arrow() {
        assert_eq!(one(b"\x1b[1;2B"), key_mod(KeyCode::Down, Modifiers::SHIFT));
    }

    #[test]
    fn function_keys() {
        assert_eq!(one(b"\x1bOP"), key(KeyCode::F(1)));
        assert_eq!(one(b"\x1b[15~"), key(KeyCode::F(5)));
        assert_eq!(one(b"\x1b[17~"), key(KeyCode::F(6)));
        assert_eq!(one(b"\x1b[21~"), key(KeyCode::F(10)));
        assert_eq!(one(b"\x1b[24~"), key(KeyCode::F(12)));
    }

    #[test]
    fn back_tab() {
        assert_eq!(one(b"\x1b[Z"), key_mod(KeyCode::Tab, Modifiers::SHIFT));
    }

    #[test]
    fn csi_split_across_reads() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b[1;").is_empty());
        assert!(p.has_pending());
        assert_eq!(p.advance(b"5C"), vec![key_mod(KeyCode::Right, Modifiers::CTRL)]);
    }

    // -- Kitty ----------------------------------------------------------------

    #[test]
    fn kitty_ctrl_shift_letter() {
        assert_eq!(
            one(b"\x1b[122;6u"),
            key_mod(KeyCode::Char('z'), Modifiers::CTRL | Modifiers::SHIFT)
        );
    }

    #[test]
    fn kitty_escape_and_event_suffix() {
        assert_eq!(one(b"\x1b[27u"), key(KeyCode::Escape));
        assert_eq!(one(b"\x1b[97;5:1u"), key_mod(KeyCode::Char('a'), Modifiers::CTRL));
    }

    // -- Alt and ESC ----------------------------------------------------------

    #[test]
    fn alt_letter() {
        assert_eq!(one(b"\x1bx"), key_mod(KeyCode::Char('x'), Modifiers::ALT));
    }

    #[test]
    fn lone_escape_needs_flush() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b").is_empty());
        assert_eq!(p.flush(), vec![key(KeyCode::Escape)]);
        assert!(!p.has_pending());
    }

    #[test]
    fn unknown_sequence_is_skipped() {
        assert_eq!(parse(b"\x1b[99~a"), vec![key(KeyCode::Char('a'))]);
    }
}
