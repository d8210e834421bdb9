// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Stdin reading: a background byte pump plus a key-level reader on top.
//
// `StdinReader` owns a thread that polls stdin and forwards raw chunks over
// a channel; polling with a short timeout lets it notice the stop flag, so
// the thread can be shut down while a child process needs the terminal.
//
// `KeyReader` feeds those chunks through `input::Parser` and hands out one
// `KeyEvent` at a time, resolving the lone-ESC ambiguity with a short
// timeout.

use std::collections::VecDeque;
#[cfg(unix)]
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::input::{KeyEvent, Parser};

/// One keypress is a few bytes, a paste can be kilobytes.
const READ_BUF_SIZE: usize = 4096;

/// How often the pump thread re-checks its stop flag.
const POLL_TIMEOUT_MS: i32 = 50;

/// How long a lone ESC waits for the rest of a sequence.
const ESC_TIMEOUT: Duration = Duration::from_millis(25);

// ─── StdinReader ─────────────────────────────────────────────────────────────

/// Background thread forwarding raw stdin bytes.
pub struct StdinReader {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl StdinReader {
    /// Start the pump. The receiver yields non-empty byte chunks and
    /// disconnects when the reader stops or stdin closes.
    ///
    /// # Errors
    ///
    /// Fails if the OS refuses to spawn a thread.
    pub fn spawn() -> std::io::Result<(Self, Receiver<Vec<u8>>)> {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || pump(&tx, &flag))?;

        Ok((
            Self {
                handle: Some(handle),
                stop,
            },
            rx,
        ))
    }

    /// Signal the thread and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StdinReader {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(unix)]
fn pump(tx: &mpsc::Sender<Vec<u8>>, stop: &AtomicBool) {
    use std::os::unix::io::AsRawFd;

    let fd = io::stdin().as_raw_fd();
    let mut buf = [0u8; READ_BUF_SIZE];

    while !stop.load(Ordering::Relaxed) {
        let ready = unsafe {
            let mut pfd = libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            };
            libc::poll(&raw mut pfd, 1, POLL_TIMEOUT_MS)
        };
        if ready <= 0 {
            continue;
        }

        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n <= 0 {
            break;
        }
        #[allow(clippy::cast_sign_loss)] // n > 0 checked above.
        let chunk = buf[..n as usize].to_vec();
        if tx.send(chunk).is_err() {
            break;
        }
    }
}

#[cfg(not(unix))]
fn pump(tx: &mpsc::Sender<Vec<u8>>, stop: &AtomicBool) {
    use std::io::Read;

    let mut buf = [0u8; READ_BUF_SIZE];
    while !stop.load(Ordering::Relaxed) {
        match std::io::stdin().lock().read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
        }
    }
}

// ─── KeyReader ───────────────────────────────────────────────────────────────

/// Why [`KeyReader::read_key`] returned without a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Key(KeyEvent),
    /// The timeout elapsed.
    Timeout,
    /// Stdin closed or the reader is paused.
    Closed,
}

/// Key-level reader over any byte channel.
pub struct KeyReader {
    pump: Option<StdinReader>,
    rx: Option<Receiver<Vec<u8>>>,
    parser: Parser,
    queued: VecDeque<KeyEvent>,
}

impl KeyReader {
    /// Read keys from the process's stdin.
    ///
    /// # Errors
    ///
    /// Fails if the pump thread cannot be spawned.
    pub fn stdin() -> std::io::Result<Self> {
        let (pump, rx) = StdinReader::spawn()?;
        Ok(Self {
            pump: Some(pump),
            rx: Some(rx),
            parser: Parser::new(),
            queued: VecDeque::new(),
        })
    }

    /// Read keys from an arbitrary byte channel. Used by tests.
    #[must_use]
    pub fn from_channel(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            pump: None,
            rx: Some(rx),
            parser: Parser::new(),
            queued: VecDeque::new(),
        }
    }

    /// Stop reading stdin so a child process can own it.
    pub fn pause(&mut self) {
        if let Some(mut pump) = self.pump.take() {
            pump.stop();
            self.rx = None;
        }
        self.queued.clear();
        let _ = self.parser.flush();
    }

    /// Restart the stdin pump after [`pause`](Self::pause).
    ///
    /// # Errors
    ///
    /// Fails if the pump thread cannot be spawned.
    pub fn resume(&mut self) -> std::io::Result<()> {
        if self.rx.is_none() {
            let (pump, rx) = StdinReader::spawn()?;
            self.pump = Some(pump);
            self.rx = Some(rx);
        }
        Ok(())
    }

    /// Wait up to `timeout` (forever for `None`) for the next key.
    pub fn read_key(&mut self, timeout: Option<Duration>) -> ReadOutcome {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if let Some(key) = self.queued.pop_front() {
                return ReadOutcome::Key(key);
            }
            let Some(rx) = &self.rx else {
                return ReadOutcome::Closed;
            };

            let wait = if self.parser.has_pending() {
                Some(ESC_TIMEOUT)
            } else {
                deadline.map(|d| d.saturating_duration_since(Instant::now()))
            };

            let received = match wait {
                Some(w) => rx.recv_timeout(w),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(bytes) => self.queued.extend(self.parser.advance(&bytes)),
                Err(RecvTimeoutError::Timeout) if self.parser.has_pending() => {
                    self.queued.extend(self.parser.flush());
                }
                Err(RecvTimeoutError::Timeout) => return ReadOutcome::Timeout,
                Err(RecvTimeoutError::Disconnected) => {
                    self.queued.extend(self.parser.flush());
                    if let Some(key) = self.queued.pop_front() {
                        return ReadOutcome::Key(key);
                    }
                    self.rx = None;
                    return ReadOutcome::Closed;
                }
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{KeyCode, Modifiers};
    use pretty_assertions::assert_eq;

    fn reader_with(chunks: &[&[u8]]) -> (KeyReader, mpsc::Sender<Vec<u8>>) {
        let (tx, rx) = mpsc::channel();
        for c in chunks {
            tx.send(c.to_vec()).unwrap();
        }
        (KeyReader::from_channel(rx), tx)
    }

    #[test]
    fn reads_keys_in_order() {
        let (mut r, _tx) = reader_with(&[b"ab"]);
        assert_eq!(
            r.read_key(Some(Duration::from_millis(10))),
            ReadOutcome::Key(KeyEvent::plain(KeyCode::Char('a')))
        );
        assert_eq!(
            r.read_key(Some(Duration::from_millis(10))),
            ReadOutcome::Key(KeyEvent::plain(KeyCode::Char('b')))
        );
    }

    #[test]
    fn timeout_without_input() {
        let (mut r, _tx) = reader_with(&[]);
        assert_eq!(
            r.read_key(Some(Duration::from_millis(5))),
            ReadOutcome::Timeout
        );
    }

    #[test]
    fn lone_escape_resolves_after_short_wait() {
        let (mut r, _tx) = reader_with(&[b"\x1b"]);
        assert_eq!(
            r.read_key(None),
            ReadOutcome::Key(KeyEvent::plain(KeyCode::Escape))
        );
    }

    #[test]
    fn sequence_split_across_chunks() {
        let (mut r, _tx) = reader_with(&[b"\x1b[1;", b"2A"]);
        assert_eq!(
            r.read_key(Some(Duration::from_millis(50))),
            ReadOutcome::Key(KeyEvent::new(KeyCode::Up, Modifiers::SHIFT))
        );
    }

    #[test]
    fn disconnected_channel_reports_closed() {
        let (mut r, tx) = reader_with(&[b"x"]);
        drop(tx);
        assert_eq!(
            r.read_key(None),
            ReadOutcome::Key(KeyEvent::plain(KeyCode::Char('x')))
        );
        assert_eq!(r.read_key(None), ReadOutcome::Closed);
    }
}
