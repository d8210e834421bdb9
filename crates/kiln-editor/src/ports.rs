//! Capabilities the editor consumes from its surroundings.
//!
//! The editor core never talks to the terminal, the clipboard, or child
//! processes directly. It goes through these traits:
//!
//! - [`Renderer`] + [`KeySource`] (together a [`Frontend`]): drawing and
//!   key input. The terminal implementation lives in the binary; tests use
//!   scripted fakes.
//! - [`CommandRunner`]: argv execution without a shell, with a timeout.
//! - [`Clipboard`]: copy / paste. [`SystemClipboard`] goes through the
//!   command runner, [`InternalClipboard`] is the in-process fallback.
//! - [`VcsInfoProvider`]: branch, user and commit count for the status line.

use std::env;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use kiln_term::reader::ReadOutcome;
use kiln_term::style::Style;

use crate::error::ExternalToolError;

// ---------------------------------------------------------------------------
// Renderer / KeySource
// ---------------------------------------------------------------------------

/// Cell-addressed drawing surface with a double-buffered flush.
///
/// Drawing calls only touch the back buffer; nothing reaches the screen
/// until [`present`](Renderer::present).
pub trait Renderer {
    /// `(columns, rows)`.
    fn size(&self) -> (u16, u16);

    /// Blank the back buffer.
    fn clear(&mut self);

    /// Draw `text` starting at cell `(x, y)`. Returns the cells used.
    fn put_str(&mut self, x: u16, y: u16, text: &str, style: Style) -> u16;

    /// Where the hardware cursor goes on the next present; `None` hides it.
    fn set_cursor(&mut self, cell: Option<(u16, u16)>);

    /// Flush the back buffer to the screen.
    ///
    /// # Errors
    ///
    /// Terminal write failures.
    fn present(&mut self) -> io::Result<()>;

    /// Hand the terminal to a child process.
    ///
    /// # Errors
    ///
    /// Terminal mode changes failing.
    fn suspend(&mut self) -> io::Result<()>;

    /// Take the terminal back and repaint everything on the next present.
    ///
    /// # Errors
    ///
    /// Terminal mode changes failing.
    fn resume(&mut self) -> io::Result<()>;
}

pub trait KeySource {
    /// Wait up to `timeout` (forever for `None`) for one key.
    fn next_key(&mut self, timeout: Option<Duration>) -> ReadOutcome;
}

/// Everything interactive code needs from the UI.
pub trait Frontend: Renderer + KeySource {}

impl<T: Renderer + KeySource> Frontend for T {}

// ---------------------------------------------------------------------------
// CommandRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub stdin: Option<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl RunOptions {
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.status, Some(0))
    }
}

/// Runs an argument vector to completion. No shell is involved.
pub trait CommandRunner: Send + Sync {
    /// # Errors
    ///
    /// [`ExternalToolError::NotFound`] when `argv[0]` cannot be executed,
    /// [`ExternalToolError::Timeout`] when the deadline passes (the child is
    /// killed), [`ExternalToolError::Failed`] for anything else.
    fn run(&self, argv: &[String], opts: &RunOptions) -> Result<CommandOutput, ExternalToolError>;
}

/// [`CommandRunner`] over `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

const WAIT_POLL: Duration = Duration::from_millis(10);

impl CommandRunner for ProcessRunner {
    fn run(&self, argv: &[String], opts: &RunOptions) -> Result<CommandOutput, ExternalToolError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(ExternalToolError::Failed("empty command".into()));
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(if opts.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &opts.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ExternalToolError::NotFound(program.clone()),
            _ => ExternalToolError::Failed(e.to_string()),
        })?;
        tracing::debug!(target: "kiln::worker", program = %program, pid = child.id(), "spawned");

        if let (Some(mut stdin), Some(input)) = (child.stdin.take(), opts.stdin.clone()) {
            thread::spawn(move || {
                let _ = stdin.write_all(input.as_bytes());
            });
        }
        let stdout = child.stdout.take().map(drain_pipe);
        let stderr = child.stderr.take().map(drain_pipe);

        let deadline = opts.timeout.map(|t| Instant::now() + t);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => return Err(ExternalToolError::Failed(e.to_string())),
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(target: "kiln::worker", program = %program, "command timed out");
                return Err(ExternalToolError::Timeout);
            }
            thread::sleep(WAIT_POLL);
        };

        let collect = |h: Option<thread::JoinHandle<String>>| {
            h.and_then(|h| h.join().ok()).unwrap_or_default()
        };
        Ok(CommandOutput {
            status: status.code(),
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }
}

fn drain_pipe<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        let _ = pipe.read_to_end(&mut bytes);
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

/// First `name` found on `$PATH`.
#[must_use]
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

// ---------------------------------------------------------------------------
// Clipboard
// ---------------------------------------------------------------------------

pub trait Clipboard {
    /// Short name for status messages.
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// The backing facility failing.
    fn copy(&mut self, text: &str) -> Result<(), ExternalToolError>;

    /// # Errors
    ///
    /// The backing facility failing.
    fn paste(&mut self) -> Result<String, ExternalToolError>;
}

/// In-process clipboard. Never fails.
#[derive(Debug, Clone, Default)]
pub struct InternalClipboard {
    text: String,
}

impl Clipboard for InternalClipboard {
    fn name(&self) -> &str {
        "internal"
    }

    fn copy(&mut self, text: &str) -> Result<(), ExternalToolError> {
        self.text = text.to_string();
        Ok(())
    }

    fn paste(&mut self) -> Result<String, ExternalToolError> {
        Ok(self.text.clone())
    }
}

/// Copy / paste command pair of a clipboard tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardTool {
    pub name: &'static str,
    pub copy: Vec<String>,
    pub paste: Vec<String>,
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}

/// Known tools in preference order. Wayland tools only count inside a
/// Wayland session.
#[must_use]
pub fn clipboard_tools() -> Vec<ClipboardTool> {
    let mut tools = Vec::new();
    if env::var_os("WAYLAND_DISPLAY").is_some() {
        tools.push(ClipboardTool {
            name: "wl-copy",
            copy: argv(&["wl-copy"]),
            paste: argv(&["wl-paste", "--no-newline"]),
        });
    }
    tools.push(ClipboardTool {
        name: "xclip",
        copy: argv(&["xclip", "-selection", "clipboard"]),
        paste: argv(&["xclip", "-selection", "clipboard", "-o"]),
    });
    tools.push(ClipboardTool {
        name: "xsel",
        copy: argv(&["xsel", "--clipboard", "--input"]),
        paste: argv(&["xsel", "--clipboard", "--output"]),
    });
    tools.push(ClipboardTool {
        name: "pbcopy",
        copy: argv(&["pbcopy"]),
        paste: argv(&["pbpaste"]),
    });
    tools
}

const CLIPBOARD_TIMEOUT: Duration = Duration::from_secs(2);

/// System clipboard through an external tool.
pub struct SystemClipboard {
    tool: ClipboardTool,
    runner: Arc<dyn CommandRunner>,
}

impl SystemClipboard {
    /// Pick the first tool whose executables are on `$PATH`. `None` when
    /// there is none; callers then use the internal clipboard only.
    #[must_use]
    pub fn detect(runner: Arc<dyn CommandRunner>) -> Option<Self> {
        let tool = clipboard_tools().into_iter().find(|t| {
            [&t.copy[0], &t.paste[0]]
                .iter()
                .all(|exe| find_executable(exe).is_some())
        });
        match tool {
            Some(tool) => {
                tracing::info!(target: "kiln::io", tool = tool.name, "system clipboard available");
                Some(Self { tool, runner })
            }
            None => {
                tracing::info!(target: "kiln::io", "no system clipboard tool found");
                None
            }
        }
    }

    #[must_use]
    pub fn with_tool(tool: ClipboardTool, runner: Arc<dyn CommandRunner>) -> Self {
        Self { tool, runner }
    }
}

impl Clipboard for SystemClipboard {
    fn name(&self) -> &str {
        "system"
    }

    fn copy(&mut self, text: &str) -> Result<(), ExternalToolError> {
        let opts = RunOptions {
            stdin: Some(text.to_string()),
            timeout: Some(CLIPBOARD_TIMEOUT),
            ..RunOptions::default()
        };
        let out = self.runner.run(&self.tool.copy, &opts)?;
        if out.success() {
            Ok(())
        } else {
            Err(ExternalToolError::Failed(out.stderr.trim().to_string()))
        }
    }

    fn paste(&mut self) -> Result<String, ExternalToolError> {
        let out = self
            .runner
            .run(&self.tool.paste, &RunOptions::with_timeout(CLIPBOARD_TIMEOUT))?;
        if out.success() {
            Ok(out.stdout)
        } else {
            Err(ExternalToolError::Failed(out.stderr.trim().to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// VCS info
// ---------------------------------------------------------------------------

/// Repository summary for the status line. All fields are empty outside a
/// repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcsInfo {
    /// Branch name, with `*` appended when the work tree is dirty.
    pub branch: String,
    pub user_name: String,
    pub commit_count: String,
}

pub trait VcsInfoProvider: Send + Sync {
    /// Info for the repository containing `file` (or the working directory).
    fn info(&self, file: Option<&Path>) -> VcsInfo;
}

const GIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Git over the command runner.
pub struct GitInfo {
    runner: Arc<dyn CommandRunner>,
}

impl GitInfo {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn git(&self, dir: &Path, args: &[&str]) -> Option<String> {
        let mut argv = vec!["git".to_string()];
        argv.extend(args.iter().map(|a| (*a).to_string()));
        let opts = RunOptions {
            cwd: Some(dir.to_path_buf()),
            timeout: Some(GIT_TIMEOUT),
            ..RunOptions::default()
        };
        match self.runner.run(&argv, &opts) {
            Ok(out) if out.success() => Some(out.stdout.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(target: "kiln::worker", error = %e, ?args, "git query failed");
                None
            }
        }
    }
}

/// Directory whose repository describes `file`.
fn repo_dir(file: Option<&Path>) -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    let dir = match file {
        Some(f) => {
            let abs = if f.is_absolute() { f.to_path_buf() } else { cwd.join(f) };
            abs.parent().map_or(cwd, Path::to_path_buf)
        }
        None => cwd,
    };
    dir.ancestors()
        .any(|d| d.join(".git").exists())
        .then_some(dir)
}

impl VcsInfoProvider for GitInfo {
    fn info(&self, file: Option<&Path>) -> VcsInfo {
        let Some(dir) = repo_dir(file) else {
            return VcsInfo::default();
        };

        let mut branch = self
            .git(&dir, &["branch", "--show-current"])
            .filter(|b| !b.is_empty())
            .or_else(|| self.git(&dir, &["symbolic-ref", "--short", "HEAD"]))
            .unwrap_or_else(|| "main".to_string());
        if self
            .git(&dir, &["status", "--short"])
            .is_some_and(|s| !s.is_empty())
        {
            branch.push('*');
        }

        VcsInfo {
            branch,
            user_name: self.git(&dir, &["config", "user.name"]).unwrap_or_default(),
            commit_count: self
                .git(&dir, &["rev-list", "--count", "HEAD"])
                .unwrap_or_else(|| "0".to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
