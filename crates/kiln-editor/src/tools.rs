//! External programs: the run-command prompt, the git menu, and the
//! lint and VCS workers.
//!
//! `run_command` is the only tool that holds the UI: the terminal is handed
//! to the child until it exits. Everything else runs on a worker thread and
//! reports through the bridge.

use std::io::Write as _;
use std::sync::Arc;

use thiserror::Error;

use crate::bridge::TaskMessage;
use crate::editor::Editor;
use crate::mode::EditorState;
use crate::ports::{CommandOutput, Frontend, RunOptions};

/// Longest document handed to the linter, in chars.
pub const MAX_LINT_CHARS: usize = 100_000;

const COMMAND_PREVIEW: usize = 80;
const GIT_ERROR_PREVIEW: usize = 120;

// ---------------------------------------------------------------------------
// Argument splitting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("No closing quotation")]
    UnclosedQuote,
    #[error("No escaped character")]
    TrailingEscape,
}

#[derive(Clone, Copy)]
enum Quote {
    None,
    Single,
    Double,
}

/// Split a command line into arguments with POSIX shell quoting: single
/// quotes are literal, double quotes allow `\"` and `\\`, and a backslash
/// outside quotes escapes the next char. No expansion of any kind.
///
/// # Errors
///
/// [`SplitError`] for an unterminated quote or a trailing backslash.
pub fn split_args(line: &str) -> Result<Vec<String>, SplitError> {
    let mut args = Vec::new();
    // `Some` once a token has started, so `''` yields an empty argument.
    let mut token: Option<String> = None;
    let mut quote = Quote::None;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Quote::Single => {
                if c == '\'' {
                    quote = Quote::None;
                } else {
                    token.get_or_insert_with(String::new).push(c);
                }
            }
            Quote::Double => match c {
                '"' => quote = Quote::None,
                '\\' => {
                    let tok = token.get_or_insert_with(String::new);
                    match chars.peek() {
                        Some(&next) if next == '"' || next == '\\' => {
                            tok.push(next);
                            chars.next();
                        }
                        Some(_) => tok.push('\\'),
                        None => return Err(SplitError::UnclosedQuote),
                    }
                }
                _ => token.get_or_insert_with(String::new).push(c),
            },
            Quote::None => match c {
                c if c.is_whitespace() => {
                    if let Some(tok) = token.take() {
                        args.push(tok);
                    }
                }
                '\'' => {
                    token.get_or_insert_with(String::new);
                    quote = Quote::Single;
                }
                '"' => {
                    token.get_or_insert_with(String::new);
                    quote = Quote::Double;
                }
                '\\' => {
                    let next = chars.next().ok_or(SplitError::TrailingEscape)?;
                    token.get_or_insert_with(String::new).push(next);
                }
                _ => token.get_or_insert_with(String::new).push(c),
            },
        }
    }

    if !matches!(quote, Quote::None) {
        return Err(SplitError::UnclosedQuote);
    }
    args.extend(token);
    Ok(args)
}

fn preview(text: &str, max: usize) -> String {
    text.trim().chars().take(max).collect()
}

/// Status text for a finished `run_command` child.
fn command_summary(out: &CommandOutput) -> (String, bool) {
    if out.stderr.trim().is_empty() {
        (
            format!("Command executed: {}...", preview(&out.stdout, COMMAND_PREVIEW)),
            false,
        )
    } else {
        (
            format!("Error: {}...", preview(&out.stderr, COMMAND_PREVIEW)),
            true,
        )
    }
}

/// Status text for lint output.
fn lint_summary(output: &str, name: &str) -> String {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).take(2).collect();
    if lines.is_empty() {
        format!("No issues found in {name}")
    } else {
        lines.join(" | ")
    }
}

// ---------------------------------------------------------------------------
// Git menu
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GitCommand {
    Status,
    Commit,
    Push,
    Pull,
    Diff,
}

impl GitCommand {
    fn from_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(Self::Status),
            "2" => Some(Self::Commit),
            "3" => Some(Self::Push),
            "4" => Some(Self::Pull),
            "5" => Some(Self::Diff),
            _ => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Commit => "commit",
            Self::Push => "push",
            Self::Pull => "pull",
            Self::Diff => "diff",
        }
    }

    /// Commands that change what the status line shows.
    const fn changes_head(self) -> bool {
        matches!(self, Self::Commit | Self::Pull)
    }
}

pub const GIT_MENU_PROMPT: &str = "Git menu [1:status 2:commit 3:push 4:pull 5:diff] → ";

// ---------------------------------------------------------------------------
// Editor operations
// ---------------------------------------------------------------------------

impl Editor {
    pub(crate) fn run_command(&mut self, ui: &mut dyn Frontend) {
        let Some(line) = self.ask(ui, "Enter command: ") else {
            self.set_message("Command cancelled");
            return;
        };
        let argv = match split_args(&line) {
            Ok(argv) if argv.is_empty() => {
                self.set_message("Empty command");
                return;
            }
            Ok(argv) => argv,
            Err(e) => {
                self.set_error(format!("Parse error: {e}"));
                return;
            }
        };

        tracing::info!(target: "kiln::worker", ?argv, "running command");
        self.state = EditorState::ExternalCommandRunning;
        if let Err(e) = ui.suspend() {
            tracing::warn!(target: "kiln::term", error = %e, "suspend failed");
        }
        let opts = RunOptions::with_timeout(self.ctx.settings().command_timeout());
        let result = self.runner.run(&argv, &opts);
        if let Err(e) = ui.resume() {
            tracing::warn!(target: "kiln::term", error = %e, "resume failed");
        }
        self.state = EditorState::Editing;

        match result {
            Ok(out) => {
                let (text, is_error) = command_summary(&out);
                if is_error {
                    self.set_error(text);
                } else {
                    self.set_message(text);
                }
            }
            Err(e) => {
                tracing::warn!(target: "kiln::worker", error = %e, "command failed");
                self.set_error(e.to_string());
            }
        }
    }

    pub(crate) fn git_menu(&mut self, ui: &mut dyn Frontend) {
        let Some(cmd) = self
            .ask(ui, GIT_MENU_PROMPT)
            .as_deref()
            .and_then(GitCommand::from_choice)
        else {
            self.set_message("Invalid choice or cancelled");
            return;
        };

        let mut argv = vec!["git".to_string(), cmd.name().to_string()];
        if cmd == GitCommand::Commit {
            let Some(msg) = self.ask(ui, "Commit message: ").filter(|m| !m.trim().is_empty()) else {
                self.set_message("Commit cancelled");
                return;
            };
            argv.push("-am".to_string());
            argv.push(msg);
        }

        self.set_message(format!("Running git {}...", cmd.name()));
        let runner = Arc::clone(&self.runner);
        let vcs = Arc::clone(&self.vcs_provider);
        let path = self.path.clone();
        let opts = RunOptions::with_timeout(self.ctx.settings().command_timeout());
        let sender = self.bridge.sender();
        let poster = sender.clone();
        sender.spawn("git", move || {
            let status = match runner.run(&argv, &opts) {
                Ok(out) if out.success() => format!("Git {} successful", cmd.name()),
                Ok(out) => format!("Git error: {}", preview(&out.stderr, GIT_ERROR_PREVIEW)),
                Err(e) => format!("Git error: {e}"),
            };
            tracing::info!(target: "kiln::worker", command = cmd.name(), %status, "git finished");
            if cmd.changes_head() {
                poster.status(status);
                TaskMessage::VcsInfo(vcs.info(path.as_deref()))
            } else {
                TaskMessage::Status(status)
            }
        });
    }

    /// Recompute branch, user, and commit count off-thread.
    pub(crate) fn refresh_vcs(&self) {
        let vcs = Arc::clone(&self.vcs_provider);
        let path = self.path.clone();
        self.bridge
            .sender()
            .spawn("vcs", move || TaskMessage::VcsInfo(vcs.info(path.as_deref())));
    }

    /// Lint the saved document when a lint command is configured for its
    /// language. The buffer text goes through a temp file with the same
    /// extension so the linter picks the right rules.
    pub(crate) fn spawn_lint(&self) {
        let Some(argv) = self.ctx.lint_command(&self.language).map(<[String]>::to_vec) else {
            return;
        };
        let name = self.display_name();
        let sender = self.bridge.sender();

        let text = self.buffer.text();
        if text.chars().count() > MAX_LINT_CHARS {
            sender.status("File is too large for lint analysis");
            return;
        }

        let suffix = self
            .path
            .as_deref()
            .and_then(std::path::Path::extension)
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let file = tempfile::Builder::new()
            .prefix("kiln-lint-")
            .suffix(&suffix)
            .tempfile()
            .and_then(|mut f| f.write_all(text.as_bytes()).map(|()| f));
        let file = match file {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(target: "kiln::worker", error = %e, "lint temp file failed");
                sender.status(format!("Lint error: {e}"));
                return;
            }
        };

        let runner = Arc::clone(&self.runner);
        let opts = RunOptions::with_timeout(self.ctx.settings().command_timeout());
        sender.spawn("lint", move || {
            let mut full = argv;
            full.push(file.path().to_string_lossy().into_owned());
            let status = match runner.run(&full, &opts) {
                Ok(out) => lint_summary(&format!("{}\n{}", out.stdout, out.stderr), &name),
                Err(e) => format!("Lint error: {e}"),
            };
            drop(file);
            TaskMessage::Status(status)
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
