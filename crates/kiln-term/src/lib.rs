// SPDX-License-Identifier: MIT
//
// kiln-term: the terminal layer under the kiln editor.
//
// Raw termios, ANSI output, and key decoding without a TUI framework. The
// editor paints a whole `Frame` per redraw; `DiffRenderer` turns that into
// the minimal escape stream. Input bytes arrive on a background pump and
// `KeyReader` decodes them into `KeyEvent`s.

pub mod ansi;
pub mod diff;
pub mod frame;
pub mod input;
pub mod reader;
pub mod style;
pub mod terminal;
