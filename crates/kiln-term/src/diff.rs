// SPDX-License-Identifier: MIT
//
// Differential frame output.
//
// Each redraw paints a complete `Frame`; `DiffRenderer` compares it with the
// frame it flushed last time and encodes only the cells that changed. All
// bytes for one frame accumulate in memory and leave in a single write,
// wrapped in synchronized-output markers so the terminal never shows a
// half-drawn screen.
//
//   1. Unchanged rows are skipped with one slice comparison.
//   2. `CellWriter` skips cursor moves for adjacent cells and SGR sequences
//      when the style did not change.
//   3. The hardware cursor is placed (or hidden) after the cells.

use std::io::{self, Write};

use crate::ansi;
use crate::frame::{Cell, Frame};
use crate::style::Style;

// ─── CellWriter ──────────────────────────────────────────────────────────────

/// Encodes cells, remembering cursor and style so redundant escapes are
/// never written.
#[derive(Debug)]
struct CellWriter {
    last_x: i32,
    last_y: i32,
    last_style: Option<Style>,
}

impl CellWriter {
    const fn new() -> Self {
        Self {
            last_x: -1,
            last_y: -1,
            last_style: None,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn write_cell(&mut self, out: &mut Vec<u8>, x: u16, y: u16, cell: &Cell) -> io::Result<()> {
        let (xi, yi) = (i32::from(x), i32::from(y));

        if cell.is_continuation() && self.last_y == yi && self.last_x == xi - 1 {
            // The wide glyph written just before already covers this column.
            self.last_x = xi;
            return Ok(());
        }

        if yi != self.last_y || xi != self.last_x + 1 {
            ansi::cursor_to(out, x, y)?;
        }
        if self.last_style != Some(cell.style) {
            ansi::style(out, cell.style)?;
            self.last_style = Some(cell.style);
        }

        if cell.is_continuation() {
            out.push(b' ');
        } else {
            let mut enc = [0u8; 4];
            out.extend_from_slice(cell.ch.encode_utf8(&mut enc).as_bytes());
        }

        self.last_x = xi;
        self.last_y = yi;
        Ok(())
    }
}

// ─── DiffRenderer ────────────────────────────────────────────────────────────

/// Counters from one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    pub cells_rendered: usize,
    pub cells_skipped: usize,
}

/// Frame-to-frame differ that owns the output byte buffer.
#[derive(Debug)]
pub struct DiffRenderer {
    out: Vec<u8>,
    writer: CellWriter,
    previous: Option<Frame>,
}

impl DiffRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            out: Vec::with_capacity(16_384),
            writer: CellWriter::new(),
            previous: None,
        }
    }

    /// Encode the difference between `current` and the last rendered frame,
    /// then place the cursor at `cursor` (or hide it for `None`).
    ///
    /// # Errors
    ///
    /// Only fails if encoding into the in-memory buffer fails, which a
    /// `Vec` never does; the `Result` keeps `?` usable throughout.
    pub fn render(&mut self, current: &Frame, cursor: Option<(u16, u16)>) -> io::Result<RenderStats> {
        self.out.clear();
        self.writer.reset();
        let mut stats = RenderStats::default();

        ansi::begin_sync(&mut self.out)?;
        ansi::cursor_hide(&mut self.out)?;

        let full = self.previous.as_ref().is_none_or(|prev| {
            prev.width() != current.width() || prev.height() != current.height()
        });
        if full {
            ansi::reset(&mut self.out)?;
            ansi::clear_screen(&mut self.out)?;
        }

        for y in 0..current.height() {
            let prev_row = if full {
                None
            } else {
                self.previous.as_ref().and_then(|p| p.row(y))
            };
            let Some(row) = current.row(y) else { break };

            if prev_row == Some(row) {
                stats.cells_skipped += row.len();
                continue;
            }

            for (x, cell) in (0u16..).zip(row) {
                let changed = prev_row.is_none_or(|p| p[usize::from(x)] != *cell);
                if changed {
                    self.writer.write_cell(&mut self.out, x, y, cell)?;
                    stats.cells_rendered += 1;
                } else {
                    stats.cells_skipped += 1;
                }
            }
        }

        ansi::reset(&mut self.out)?;
        if let Some((x, y)) = cursor {
            ansi::cursor_to(&mut self.out, x, y)?;
            ansi::cursor_show(&mut self.out)?;
        }
        ansi::end_sync(&mut self.out)?;

        match &mut self.previous {
            Some(prev) => prev.copy_from(current),
            None => self.previous = Some(current.clone()),
        }

        Ok(stats)
    }

    /// Bytes produced by the last [`render`](Self::render).
    #[must_use]
    pub fn output_bytes(&self) -> &[u8] {
        &self.out
    }

    /// Write the encoded frame to `w` in one call.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `w`.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.out.is_empty() {
            w.write_all(&self.out)?;
            w.flush()?;
            self.out.clear();
        }
        Ok(())
    }

    /// Forget the previous frame so the next render repaints everything.
    /// Needed after the screen was handed to another program.
    pub fn force_redraw(&mut self) {
        self.previous = None;
    }
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
