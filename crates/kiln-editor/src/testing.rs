//! Scripted fakes for the capability traits.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kiln_term::frame::Frame;
use kiln_term::input::{KeyCode, KeyEvent, Modifiers};
use kiln_term::reader::ReadOutcome;
use kiln_term::style::Style;

use crate::error::ExternalToolError;
use crate::ports::{
    Clipboard, CommandOutput, CommandRunner, KeySource, Renderer, RunOptions, VcsInfo,
    VcsInfoProvider,
};

// ---------------------------------------------------------------------------
// FakeFrontend
// ---------------------------------------------------------------------------

/// In-memory screen plus a queue of keys. Input runs dry as `Closed`.
pub struct FakeFrontend {
    frame: Frame,
    keys: VecDeque<KeyEvent>,
    cursor: Option<(u16, u16)>,
    pub presents: usize,
    pub suspended: bool,
    pub suspends: usize,
}

impl FakeFrontend {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            frame: Frame::new(width, height),
            keys: VecDeque::new(),
            cursor: None,
            presents: 0,
            suspended: false,
            suspends: 0,
        }
    }

    pub fn key(self, code: KeyCode) -> Self {
        self.chord(code, Modifiers::empty())
    }

    pub fn chord(mut self, code: KeyCode, mods: Modifiers) -> Self {
        self.keys.push_back(KeyEvent::new(code, mods));
        self
    }

    pub fn typing(mut self, text: &str) -> Self {
        self.push_text(text);
        self
    }

    pub fn push_key(&mut self, code: KeyCode) {
        self.keys.push_back(KeyEvent::plain(code));
    }

    pub fn push_text(&mut self, text: &str) {
        self.keys
            .extend(text.chars().map(|c| KeyEvent::plain(KeyCode::Char(c))));
    }

    pub fn pending(&self) -> usize {
        self.keys.len()
    }

    pub fn row_text(&self, y: u16) -> String {
        self.frame.row_text(y)
    }

    pub fn screen(&self) -> Vec<String> {
        (0..self.frame.height()).map(|y| self.row_text(y)).collect()
    }

    pub fn style_at(&self, x: u16, y: u16) -> Style {
        self.frame.get(x, y).map_or(Style::DEFAULT, |c| c.style)
    }

    pub const fn cursor(&self) -> Option<(u16, u16)> {
        self.cursor
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.frame.resize(width, height);
    }
}

impl Renderer for FakeFrontend {
    fn size(&self) -> (u16, u16) {
        (self.frame.width(), self.frame.height())
    }

    fn clear(&mut self) {
        self.frame.clear();
    }

    fn put_str(&mut self, x: u16, y: u16, text: &str, style: Style) -> u16 {
        self.frame.put_str(x, y, text, style)
    }

    fn set_cursor(&mut self, cell: Option<(u16, u16)>) {
        self.cursor = cell;
    }

    fn present(&mut self) -> io::Result<()> {
        self.presents += 1;
        Ok(())
    }

    fn suspend(&mut self) -> io::Result<()> {
        self.suspended = true;
        self.suspends += 1;
        Ok(())
    }

    fn resume(&mut self) -> io::Result<()> {
        self.suspended = false;
        Ok(())
    }
}

impl KeySource for FakeFrontend {
    fn next_key(&mut self, _timeout: Option<Duration>) -> ReadOutcome {
        self.keys.pop_front().map_or(ReadOutcome::Closed, ReadOutcome::Key)
    }
}

// ---------------------------------------------------------------------------
// ScriptedRunner
// ---------------------------------------------------------------------------

type Reply = Box<dyn Fn(&[String]) -> Result<CommandOutput, ExternalToolError> + Send + Sync>;

/// Records every call and answers from a script.
pub struct ScriptedRunner {
    pub calls: Mutex<Vec<(Vec<String>, RunOptions)>>,
    reply: Reply,
}

impl ScriptedRunner {
    pub fn new(
        reply: impl Fn(&[String]) -> Result<CommandOutput, ExternalToolError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            reply: Box::new(reply),
        })
    }

    pub fn argvs(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().iter().map(|(a, _)| a.clone()).collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, argv: &[String], opts: &RunOptions) -> Result<CommandOutput, ExternalToolError> {
        self.calls.lock().unwrap().push((argv.to_vec(), opts.clone()));
        (self.reply)(argv)
    }
}

pub fn ok(stdout: &str) -> Result<CommandOutput, ExternalToolError> {
    Ok(CommandOutput {
        status: Some(0),
        stdout: stdout.into(),
        stderr: String::new(),
    })
}

pub fn failed(status: i32, stderr: &str) -> Result<CommandOutput, ExternalToolError> {
    Ok(CommandOutput {
        status: Some(status),
        stdout: String::new(),
        stderr: stderr.into(),
    })
}

// ---------------------------------------------------------------------------
// Clipboard / VCS
// ---------------------------------------------------------------------------

/// A system clipboard that can be switched to failing.
#[derive(Default)]
pub struct FlakyClipboard {
    pub text: String,
    pub broken: bool,
}

impl Clipboard for FlakyClipboard {
    fn name(&self) -> &str {
        "system"
    }

    fn copy(&mut self, text: &str) -> Result<(), ExternalToolError> {
        if self.broken {
            return Err(ExternalToolError::Failed("clipboard offline".into()));
        }
        self.text = text.to_string();
        Ok(())
    }

    fn paste(&mut self) -> Result<String, ExternalToolError> {
        if self.broken {
            return Err(ExternalToolError::Failed("clipboard offline".into()));
        }
        Ok(self.text.clone())
    }
}

pub struct FixedVcs(pub VcsInfo);

impl VcsInfoProvider for FixedVcs {
    fn info(&self, _file: Option<&std::path::Path>) -> VcsInfo {
        self.0.clone()
    }
}
