// SPDX-License-Identifier: MIT
//
// ANSI escape sequence encoding.
//
// Stateless writers for every terminal command kiln emits. Deciding *when*
// to emit belongs to `diff::CellWriter`; this module only knows the bytes.
// Coordinates are 0-indexed here and converted to the terminal's 1-indexed
// convention on the way out.

use std::io::{self, Write};

use crate::style::{Attr, Color, Style};

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` (CUP).
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Reset all SGR state (SGR 0).
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

// ─── Style ───────────────────────────────────────────────────────────────────

fn push_color(w: &mut impl Write, color: Color, foreground: bool) -> io::Result<()> {
    let (base, bright, ext) = if foreground { (30, 90, 38) } else { (40, 100, 48) };
    match color {
        Color::Default => write!(w, ";{}", base + 9),
        Color::Indexed(i) if i < 8 => write!(w, ";{}", base + u16::from(i)),
        Color::Indexed(i) if i < 16 => write!(w, ";{}", bright + u16::from(i) - 8),
        Color::Indexed(i) => write!(w, ";{ext};5;{i}"),
        Color::Rgb(r, g, b) => write!(w, ";{ext};2;{r};{g};{b}"),
    }
}

/// Emit one SGR sequence that fully establishes `style`.
///
/// Always starts from SGR 0 so no attribute from a previous style leaks.
pub fn style(w: &mut impl Write, style: Style) -> io::Result<()> {
    w.write_all(b"\x1b[0")?;
    for (flag, code) in [
        (Attr::BOLD, b";1"),
        (Attr::DIM, b";2"),
        (Attr::ITALIC, b";3"),
        (Attr::UNDERLINE, b";4"),
        (Attr::REVERSE, b";7"),
    ] {
        if style.attrs.contains(flag) {
            w.write_all(code)?;
        }
    }
    push_color(w, style.fg, true)?;
    push_color(w, style.bg, false)?;
    w.write_all(b"m")
}

// ─── Modes ───────────────────────────────────────────────────────────────────

/// Begin synchronized output (DEC 2026). The terminal holds the frame until
/// [`end_sync`].
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

/// Enter the alternate screen (DEC 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

/// Push Kitty keyboard flags. Flag 1 (disambiguate) is what lets
/// Ctrl+Shift+letter arrive as a distinct key.
#[inline]
pub fn enable_kitty_keyboard(w: &mut impl Write, flags: u8) -> io::Result<()> {
    write!(w, "\x1b[>{flags}u")
}

/// Pop the Kitty keyboard flags pushed by [`enable_kitty_keyboard`].
#[inline]
pub fn disable_kitty_keyboard(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[<u")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
