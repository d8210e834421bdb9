//! Messages from background workers to the UI loop.
//!
//! Workers never touch the document. They hold a [`TaskSender`] and post a
//! [`TaskMessage`]; the UI loop calls [`BackgroundTaskBridge::drain`] once
//! per iteration and acts on the result itself. That includes autosave: the
//! timer thread only asks, the UI thread saves.
//!
//! Status text is "latest wins": of all status messages pending at drain
//! time only the last one is shown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::ports::VcsInfo;

/// Pending messages beyond this are dropped by `post`.
const CAPACITY: usize = 64;

/// How often the autosave timer checks whether it was disabled.
const TIMER_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskMessage {
    Status(String),
    AutosaveRequested,
    VcsInfo(VcsInfo),
}

/// Everything pending at one drain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drained {
    /// The last status message, if any arrived.
    pub status: Option<String>,
    pub autosave_requested: bool,
    pub vcs_info: Option<VcsInfo>,
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

pub struct BackgroundTaskBridge {
    tx: Sender<TaskMessage>,
    rx: Receiver<TaskMessage>,
}

impl BackgroundTaskBridge {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = bounded(CAPACITY);
        Self { tx, rx }
    }

    /// A producer handle for a worker.
    #[must_use]
    pub fn sender(&self) -> TaskSender {
        TaskSender(self.tx.clone())
    }

    /// Take everything pending without blocking.
    #[must_use]
    pub fn drain(&self) -> Drained {
        let mut out = Drained::default();
        for msg in self.rx.try_iter() {
            match msg {
                TaskMessage::Status(text) => out.status = Some(text),
                TaskMessage::AutosaveRequested => out.autosave_requested = true,
                TaskMessage::VcsInfo(info) => out.vcs_info = Some(info),
            }
        }
        out
    }
}

impl Default for BackgroundTaskBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable, `Send` producer side of the bridge.
#[derive(Debug, Clone)]
pub struct TaskSender(Sender<TaskMessage>);

impl TaskSender {
    /// Enqueue without blocking. Returns `false` if the message was dropped
    /// because the queue is full or the UI side is gone.
    pub fn post(&self, msg: TaskMessage) -> bool {
        match self.0.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(msg)) => {
                tracing::warn!(target: "kiln::bridge", ?msg, "bridge full; message dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn status(&self, text: impl Into<String>) -> bool {
        self.post(TaskMessage::Status(text.into()))
    }

    /// Run `job` on a fire-and-forget thread and post what it returns.
    pub fn spawn<F>(&self, name: &str, job: F)
    where
        F: FnOnce() -> TaskMessage + Send + 'static,
    {
        let sender = self.clone();
        let spawned = thread::Builder::new()
            .name(format!("kiln-{name}"))
            .spawn(move || {
                sender.post(job());
            });
        if let Err(e) = spawned {
            tracing::error!(target: "kiln::worker", worker = name, error = %e, "failed to spawn worker");
            self.status(format!("Could not start {name}: {e}"));
        }
    }
}

// ---------------------------------------------------------------------------
// Autosave timer
// ---------------------------------------------------------------------------

/// Thread posting [`TaskMessage::AutosaveRequested`] every `interval` while
/// enabled.
pub struct AutosaveTimer {
    enabled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl AutosaveTimer {
    /// # Errors
    ///
    /// Fails if the OS refuses to spawn the thread.
    pub fn start(interval: Duration, sender: TaskSender) -> std::io::Result<Self> {
        let enabled = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&enabled);
        let handle = thread::Builder::new()
            .name("kiln-autosave".into())
            .spawn(move || Self::run(&flag, &sender, interval))?;
        tracing::info!(target: "kiln::worker", secs = interval.as_secs(), "autosave timer started");
        Ok(Self {
            enabled,
            handle: Some(handle),
        })
    }

    fn run(enabled: &AtomicBool, sender: &TaskSender, interval: Duration) {
        let mut next = Instant::now() + interval;
        while enabled.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= next {
                if let Err(TrySendError::Disconnected(_)) =
                    sender.0.try_send(TaskMessage::AutosaveRequested)
                {
                    break;
                }
                next = now + interval;
            } else {
                thread::sleep((next - now).min(TIMER_POLL));
            }
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Disable and wait for the thread to notice.
    pub fn stop(&mut self) {
        self.enabled.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        tracing::info!(target: "kiln::worker", "autosave timer stopped");
    }
}

impl Drop for AutosaveTimer {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn latest_status_wins() {
        let bridge = BackgroundTaskBridge::new();
        let tx = bridge.sender();
        tx.status("first");
        tx.status("second");
        tx.status("third");
        assert_eq!(bridge.drain().status.as_deref(), Some("third"));
        assert_eq!(bridge.drain(), Drained::default());
    }

    #[test]
    fn drain_collects_every_kind() {
        let bridge = BackgroundTaskBridge::new();
        let tx = bridge.sender();
        let info = VcsInfo {
            branch: "main*".into(),
            user_name: "dev".into(),
            commit_count: "12".into(),
        };
        tx.post(TaskMessage::AutosaveRequested);
        tx.post(TaskMessage::VcsInfo(info.clone()));
        tx.status("lint ok");
        assert_eq!(
            bridge.drain(),
            Drained {
                status: Some("lint ok".into()),
                autosave_requested: true,
                vcs_info: Some(info),
            }
        );
    }

    #[test]
    fn many_producers_never_block() {
        let bridge = BackgroundTaskBridge::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tx = bridge.sender();
                thread::spawn(move || {
                    for j in 0..50 {
                        tx.status(format!("{i}:{j}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(bridge.drain().status.is_some());
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let bridge = BackgroundTaskBridge::new();
        let tx = bridge.sender();
        for i in 0..CAPACITY {
            assert!(tx.status(format!("{i}")));
        }
        assert!(!tx.status("overflow"));
        let expected = format!("{}", CAPACITY - 1);
        assert_eq!(bridge.drain().status.as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn spawned_worker_posts_its_result() {
        let bridge = BackgroundTaskBridge::new();
        bridge
            .sender()
            .spawn("test", || TaskMessage::Status("done".into()));
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut got = None;
        while got.is_none() && Instant::now() < deadline {
            got = bridge.drain().status;
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(got.as_deref(), Some("done"));
    }

    #[test]
    fn autosave_timer_posts_requests_until_stopped() {
        let bridge = BackgroundTaskBridge::new();
        let mut timer = AutosaveTimer::start(Duration::from_millis(10), bridge.sender()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut requested = false;
        while !requested && Instant::now() < deadline {
            requested = bridge.drain().autosave_requested;
            thread::sleep(Duration::from_millis(5));
        }
        assert!(requested);
        timer.stop();
        assert!(!timer.is_running());
        let _ = bridge.drain();
        thread::sleep(Duration::from_millis(40));
        assert!(!bridge.drain().autosave_requested);
    }
}
