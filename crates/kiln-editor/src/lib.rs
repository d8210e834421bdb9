//! # kiln-editor — document and view engine for kiln
//!
//! Everything between the key reader and the terminal frame:
//!
//! - **[`buffer`]** — `TextBuffer`, a rope of lines with a modified flag
//! - **[`cursor`]** — cursor and selection (no sticky column)
//! - **[`viewport`]** — scroll offsets, gutter, and display-width math
//! - **[`history`]** — undo/redo log of inserts and deletes
//! - **[`highlight`]** — tokenizers and the per-line highlight cache
//! - **[`search`]** — literal search, regex replace, bracket matching
//! - **[`editor`]** — the `Editor` and its action dispatcher
//! - **[`ports`]** — what the editor needs from the outside world
//!
//! The binary wires an `Editor` to a terminal frontend; tests wire it to
//! in-memory fakes.

pub mod action;
pub mod bridge;
pub mod buffer;
pub mod config;
pub mod cursor;
pub mod editor;
pub mod encoding;
pub mod error;
pub mod fileops;
pub mod highlight;
pub mod history;
pub mod keys;
pub mod mode;
pub mod ports;
pub mod position;
pub mod prompt;
pub mod screen;
pub mod search;
pub mod tools;
pub mod viewport;

#[cfg(test)]
pub(crate) mod testing;
