// SPDX-License-Identifier: MIT
//
// Colors, text attributes, and the `Style` triple painted into cells.
//
// Colors stay in the terminal's own vocabulary: the 16 named ANSI slots
// (so themes follow the user's palette), 256-color indices, and 24-bit RGB.
// Configuration files name colors with plain words ("cyan", "bright_black")
// or hex ("#a0c8ff"); `Color::parse` is the single place that vocabulary
// is understood.

use std::fmt;

// ─── Color ───────────────────────────────────────────────────────────────────

/// A fully resolved terminal color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default (inherits the user's theme).
    #[default]
    Default,
    /// ANSI 256-color palette index. 0–15 are the named colors.
    Indexed(u8),
    /// 24-bit `TrueColor`.
    Rgb(u8, u8, u8),
}

/// Named ANSI colors in palette order.
const NAMED: [&str; 16] = [
    "black",
    "red",
    "green",
    "yellow",
    "blue",
    "magenta",
    "cyan",
    "white",
    "bright_black",
    "bright_red",
    "bright_green",
    "bright_yellow",
    "bright_blue",
    "bright_magenta",
    "bright_cyan",
    "bright_white",
];

impl Color {
    pub const BLACK: Self = Self::Indexed(0);
    pub const RED: Self = Self::Indexed(1);
    pub const GREEN: Self = Self::Indexed(2);
    pub const YELLOW: Self = Self::Indexed(3);
    pub const BLUE: Self = Self::Indexed(4);
    pub const MAGENTA: Self = Self::Indexed(5);
    pub const CYAN: Self = Self::Indexed(6);
    pub const WHITE: Self = Self::Indexed(7);
    pub const GRAY: Self = Self::Indexed(8);

    /// Parse a color name as written in a config file.
    ///
    /// Accepts the named ANSI colors (with `gray`/`grey` as an alias for
    /// `bright_black`), `default`, `#rrggbb`, and bare palette indices
    /// (`"208"`). Case and `-`/`_` are ignored.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let norm = name.trim().to_ascii_lowercase().replace('-', "_");
        match norm.as_str() {
            "default" | "none" | "reset" => return Some(Self::Default),
            "gray" | "grey" => return Some(Self::GRAY),
            _ => {}
        }

        if let Some(hex) = norm.strip_prefix('#') {
            return parse_hex(hex);
        }

        if let Some(idx) = NAMED.iter().position(|n| *n == norm) {
            // NAMED has 16 entries.
            #[allow(clippy::cast_possible_truncation)]
            return Some(Self::Indexed(idx as u8));
        }

        norm.parse::<u8>().ok().map(Self::Indexed)
    }

    /// True for [`Color::Default`].
    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Indexed(i) if (*i as usize) < NAMED.len() => f.write_str(NAMED[*i as usize]),
            Self::Indexed(i) => write!(f, "{i}"),
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
        }
    }
}

// ─── Attributes ──────────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text attributes, one bit per SGR parameter we emit.
    ///
    /// ```
    /// use kiln_term::style::Attr;
    ///
    /// let a = Attr::BOLD | Attr::REVERSE;
    /// assert!(a.contains(Attr::REVERSE));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1.
        const BOLD      = 1 << 0;
        /// SGR 2.
        const DIM       = 1 << 1;
        /// SGR 3.
        const ITALIC    = 1 << 2;
        /// SGR 4.
        const UNDERLINE = 1 << 3;
        /// SGR 7 — swap foreground and background.
        const REVERSE   = 1 << 4;
    }
}

impl Attr {
    /// Parse one attribute word (`"bold"`, `"reverse"`, ...).
    #[must_use]
    pub fn parse(word: &str) -> Option<Self> {
        match word.trim().to_ascii_lowercase().as_str() {
            "bold" => Some(Self::BOLD),
            "dim" => Some(Self::DIM),
            "italic" => Some(Self::ITALIC),
            "underline" => Some(Self::UNDERLINE),
            "reverse" | "inverse" => Some(Self::REVERSE),
            _ => None,
        }
    }
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// Foreground, background and attributes for one painted fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attr,
}

impl Style {
    /// Terminal defaults, no attributes.
    pub const DEFAULT: Self = Self {
        fg: Color::Default,
        bg: Color::Default,
        attrs: Attr::empty(),
    };

    #[inline]
    #[must_use]
    pub const fn fg(fg: Color) -> Self {
        Self {
            fg,
            bg: Color::Default,
            attrs: Attr::empty(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_bg(self, bg: Color) -> Self {
        Self { bg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_attrs(self, attrs: Attr) -> Self {
        Self { attrs, ..self }
    }

    /// Parse a style spec such as `"cyan"`, `"bold yellow"`,
    /// `"black on cyan"` or `"reverse"`.
    ///
    /// Words before `on` are attributes and the foreground; the word after
    /// `on` is the background. Unknown words make the whole spec invalid.
    #[must_use]
    pub fn parse(spec: &str) -> Option<Self> {
        let mut style = Self::DEFAULT;
        let mut words = spec.split_whitespace();
        let mut saw_any = false;

        while let Some(word) = words.next() {
            saw_any = true;
            if word.eq_ignore_ascii_case("on") {
                style.bg = Color::parse(words.next()?)?;
            } else if let Some(attr) = Attr::parse(word) {
                style.attrs |= attr;
            } else {
                style.fg = Color::parse(word)?;
            }
        }

        saw_any.then_some(style)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ── Color ─────────────────────────────────────────────────────────

    #[test]
    fn parse_named_colors() {
        assert_eq!(Color::parse("red"), Some(Color::RED));
        assert_eq!(Color::parse("Bright-Cyan"), Some(Color::Indexed(14)));
        assert_eq!(Color::parse("grey"), Some(Color::GRAY));
        assert_eq!(Color::parse("default"), Some(Color::Default));
    }

    #[test]
    fn parse_hex_and_index() {
        assert_eq!(Color::parse("#ff8000"), Some(Color::Rgb(255, 128, 0)));
        assert_eq!(Color::parse("208"), Some(Color::Indexed(208)));
        assert_eq!(Color::parse("#fff"), None);
        assert_eq!(Color::parse("mauve"), None);
    }

    #[test]
    fn display_roundtrips_names() {
        for name in NAMED {
            let c = Color::parse(name).unwrap();
            assert_eq!(c.to_string(), name);
        }
        assert_eq!(Color::Rgb(1, 2, 255).to_string(), "#0102ff");
    }

    // ── Style ─────────────────────────────────────────────────────────

    #[test]
    fn parse_style_fg_only() {
        assert_eq!(Style::parse("yellow"), Some(Style::fg(Color::YELLOW)));
    }

    #[test]
    fn parse_style_with_background_and_attrs() {
        let s = Style::parse("bold black on cyan").unwrap();
        assert_eq!(s.fg, Color::BLACK);
        assert_eq!(s.bg, Color::CYAN);
        assert_eq!(s.attrs, Attr::BOLD);
    }

    #[test]
    fn parse_style_rejects_garbage() {
        assert_eq!(Style::parse(""), None);
        assert_eq!(Style::parse("blue on"), None);
        assert_eq!(Style::parse("sparkly"), None);
    }
}
