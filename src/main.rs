// SPDX-License-Identifier: MIT
//
// kiln — a small modeless terminal text editor.
//
// This binary wires the two crates together:
//
//   kiln-term   → raw mode, key decoding, frame diffing
//   kiln-editor → document, view state, dispatcher, screen composition
//
// `TerminalFrontend` is the only code that touches the real terminal. It
// implements the editor's `Renderer` and `KeySource` ports; the editor
// itself never sees a file descriptor.
//
//   stdin → KeyReader → Editor::handle_key → dispatch → buffer/cursor
//   Editor::render → Frame → DiffRenderer → one write() to stdout
//
// Logs go to `kiln.log` in the working directory, never to the terminal.

use std::env;
use std::io;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use kiln_editor::config::{Config, EditorContext};
use kiln_editor::editor::{Editor, Services};
use kiln_editor::ports::{KeySource, Renderer};

use kiln_term::diff::DiffRenderer;
use kiln_term::frame::Frame;
use kiln_term::reader::{KeyReader, ReadOutcome};
use kiln_term::style::Style;
use kiln_term::terminal::Terminal;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "kiln.log";
const LOG_ENV: &str = "KILN_LOG";
const KEYTRACE_ENV: &str = "KILN_KEYTRACE";

// ─── Logging ────────────────────────────────────────────────────────────────

fn keytrace_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// `KILN_LOG` (default `info`), plus key tracing when asked for.
fn log_filter(spec: Option<&str>, keytrace: bool) -> EnvFilter {
    let filter = EnvFilter::try_new(spec.unwrap_or("info")).unwrap_or_else(|_| EnvFilter::new("info"));
    if keytrace {
        match "kiln::keys=trace".parse() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        }
    } else {
        filter
    }
}

/// Install the file subscriber. The guard must live until exit so the
/// background writer flushes.
fn init_logging() -> Option<WorkerGuard> {
    let appender = tracing_appender::rolling::never(".", LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = log_filter(
        env::var(LOG_ENV).ok().as_deref(),
        keytrace_enabled(env::var(KEYTRACE_ENV).ok().as_deref()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()
        .map(|()| guard)
}

// ─── TerminalFrontend ───────────────────────────────────────────────────────

/// The real terminal behind the editor's ports.
struct TerminalFrontend {
    terminal: Terminal,
    reader: KeyReader,
    frame: Frame,
    renderer: DiffRenderer,
    cursor: Option<(u16, u16)>,
}

impl TerminalFrontend {
    fn open() -> io::Result<Self> {
        let mut terminal = Terminal::new()?;
        terminal.enter()?;
        let reader = KeyReader::stdin()?;
        let size = terminal.size();
        Ok(Self {
            terminal,
            reader,
            frame: Frame::new(size.cols, size.rows),
            renderer: DiffRenderer::new(),
            cursor: None,
        })
    }
}

impl Renderer for TerminalFrontend {
    fn size(&self) -> (u16, u16) {
        let size = self.terminal.size();
        (size.cols, size.rows)
    }

    fn clear(&mut self) {
        let size = self.terminal.size();
        if (size.cols, size.rows) != (self.frame.width(), self.frame.height()) {
            tracing::debug!(target: "kiln::term", cols = size.cols, rows = size.rows, "resize");
            self.frame.resize(size.cols, size.rows);
        }
        self.frame.clear();
    }

    fn put_str(&mut self, x: u16, y: u16, text: &str, style: Style) -> u16 {
        self.frame.put_str(x, y, text, style)
    }

    fn set_cursor(&mut self, cell: Option<(u16, u16)>) {
        self.cursor = cell;
    }

    fn present(&mut self) -> io::Result<()> {
        self.renderer.render(&self.frame, self.cursor)?;
        self.renderer.flush_to(&mut io::stdout().lock())
    }

    fn suspend(&mut self) -> io::Result<()> {
        self.reader.pause();
        self.terminal.leave()
    }

    fn resume(&mut self) -> io::Result<()> {
        self.terminal.enter()?;
        self.reader.resume()?;
        self.renderer.force_redraw();
        Ok(())
    }
}

impl KeySource for TerminalFrontend {
    fn next_key(&mut self, timeout: Option<Duration>) -> ReadOutcome {
        self.reader.read_key(timeout)
    }
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    let _log_guard = init_logging();
    let file = env::args_os().nth(1).map(PathBuf::from);

    let (config, config_error) = Config::load();
    let services = Services::system(&config.editor);
    let mut editor = Editor::new(EditorContext::new(config), services);
    if let Some(path) = &file {
        editor.open_initial(path);
    }
    if let Some(e) = config_error {
        editor.task_sender().status(e.to_string());
    }

    let mut ui = TerminalFrontend::open().unwrap_or_else(|e| {
        tracing::error!(target: "kiln::term", error = %e, "terminal init failed");
        eprintln!("kiln: failed to initialize terminal: {e}");
        process::exit(1);
    });

    tracing::info!(target: "kiln::dispatch", file = ?file, "started");
    editor.run(&mut ui);

    if let Err(e) = ui.terminal.leave() {
        eprintln!("kiln: failed to restore terminal: {e}");
    }
    tracing::info!(target: "kiln::dispatch", "exited");
}

// ─── Tests ──────────────────────────────────────────────────────────────────
