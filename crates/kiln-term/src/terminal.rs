// SPDX-License-Identifier: MIT
//
// Terminal control: raw mode, alternate screen, size queries, and cleanup.
//
// Safety: termios (tcgetattr / tcsetattr), ioctl(TIOCGWINSZ), isatty and
// the raw fd write in the panic path have no safe std equivalent. Each
// unsafe block is a single libc call.
#![allow(unsafe_code)]
//
// `Terminal::enter` switches to raw mode and the alternate screen and pushes
// the Kitty "disambiguate" keyboard flag; `leave` undoes all of it. `leave`
// and `enter` double as suspend / resume when a child process needs the real
// terminal. A panic hook writes a fixed restore sequence straight to fd 1 so
// a crash never leaves the user's shell in raw mode.

use std::io::{self, Write};
use std::sync::{Mutex, Once};

use crate::ansi;

// ─── Size ────────────────────────────────────────────────────────────────────

/// Terminal dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

impl Size {
    /// Fallback when the size cannot be queried (pipes, tests).
    pub const FALLBACK: Self = Self { cols: 80, rows: 24 };
}

/// Query the size of the terminal on stdout.
#[cfg(unix)]
#[must_use]
pub fn query_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };
    (rc == 0 && ws.ws_col > 0 && ws.ws_row > 0).then_some(Size {
        cols: ws.ws_col,
        rows: ws.ws_row,
    })
}

#[cfg(not(unix))]
#[must_use]
pub fn query_size() -> Option<Size> {
    None
}

/// Whether stdin is a TTY.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Panic restore ───────────────────────────────────────────────────────────

#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

static PANIC_HOOK: Once = Once::new();

/// End sync, pop keyboard flags, reset SGR, show cursor, leave alt screen.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[?2026l\x1b[<u\x1b[0m\x1b[?25h\x1b[?1049l";

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            #[cfg(unix)]
            unsafe {
                let _ = libc::write(
                    libc::STDOUT_FILENO,
                    EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
                    EMERGENCY_RESTORE.len(),
                );
            }
            #[cfg(unix)]
            if let Ok(guard) = TERMIOS_BACKUP.lock() {
                if let Some(ref saved) = *guard {
                    unsafe {
                        let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, saved);
                    }
                }
            }
            original(info);
        }));
    });
}

// ─── Terminal ────────────────────────────────────────────────────────────────

/// Owner of the terminal's raw state. Restores the terminal on drop.
pub struct Terminal {
    #[cfg(unix)]
    saved: Option<libc::termios>,
    active: bool,
}

impl Terminal {
    /// A handle that has not touched the terminal yet.
    ///
    /// # Errors
    ///
    /// Fails when stdin is not a terminal; an interactive editor has nothing
    /// to draw on in that case.
    pub fn new() -> io::Result<Self> {
        if !is_tty() {
            return Err(io::Error::other("stdin is not a terminal"));
        }
        Ok(Self {
            #[cfg(unix)]
            saved: None,
            active: false,
        })
    }

    /// Current size, falling back to 80×24.
    #[must_use]
    pub fn size(&self) -> Size {
        query_size().unwrap_or(Size::FALLBACK)
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Raw mode, alternate screen, hidden cursor, Kitty disambiguation.
    /// Idempotent.
    ///
    /// # Errors
    ///
    /// Fails if termios or the terminal write fails.
    pub fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }
        install_panic_hook();
        self.enable_raw_mode()?;

        let mut out = io::stdout().lock();
        ansi::enter_alt_screen(&mut out)?;
        ansi::enable_kitty_keyboard(&mut out, 1)?;
        ansi::cursor_hide(&mut out)?;
        ansi::clear_screen(&mut out)?;
        out.flush()?;

        self.active = true;
        Ok(())
    }

    /// Undo [`enter`](Self::enter). Idempotent.
    ///
    /// # Errors
    ///
    /// Fails if the terminal write or termios restore fails.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        let mut out = io::stdout().lock();
        ansi::end_sync(&mut out)?;
        ansi::disable_kitty_keyboard(&mut out)?;
        ansi::reset(&mut out)?;
        ansi::cursor_show(&mut out)?;
        ansi::exit_alt_screen(&mut out)?;
        out.flush()?;
        drop(out);

        self.disable_raw_mode()?;
        self.active = false;
        Ok(())
    }

    #[cfg(unix)]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        let fd = libc::STDIN_FILENO;
        unsafe {
            let mut t: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &raw mut t) != 0 {
                return Err(io::Error::last_os_error());
            }
            self.saved = Some(t);
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = Some(t);
            }

            t.c_iflag &= !(libc::IGNBRK
                | libc::BRKINT
                | libc::PARMRK
                | libc::ISTRIP
                | libc::INLCR
                | libc::IGNCR
                | libc::ICRNL
                | libc::IXON);
            t.c_oflag &= !libc::OPOST;
            t.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
            t.c_cflag &= !(libc::CSIZE | libc::PARENB);
            t.c_cflag |= libc::CS8;
            t.c_cc[libc::VMIN] = 1;
            t.c_cc[libc::VTIME] = 0;

            if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const t) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    #[cfg(unix)]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        if let Some(saved) = self.saved.take() {
            if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const saved) } != 0 {
                return Err(io::Error::last_os_error());
            }
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = None;
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.leave() {
                tracing::warn!(target: "kiln::term", error = %e, "terminal restore failed");
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
