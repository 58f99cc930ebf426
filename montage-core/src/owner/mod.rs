//! Owning-thread event loop
//!
//! The host's UI thread is the only thread allowed to touch document state.
//! Everything else reaches it by posting zero-delay tasks onto this loop's
//! run queue. Tasks run one at a time, in the order they were posted, and
//! interleave with whatever else the host posts.
//!
//! ```text
//! worker thread ──post(task)──▶ [run queue] ──▶ OwnerLoop::run (owning thread)
//!       ▲                                              │
//!       └──────────── oneshot result ◀─────────────────┘
//! ```

use crate::errors::panic_message;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::ThreadId;
use tokio::sync::{mpsc, oneshot};

/// A unit of work marshalled onto the owning thread that reports a value or error.
pub type OwnerTask = Box<dyn FnOnce() -> Result<String, String> + Send + 'static>;

type Posted = Box<dyn FnOnce() + Send + 'static>;

enum OwnerEvent {
    Run(Posted),
    Stop,
}

/// Marshals work onto the document-owning thread and hands back the outcome.
///
/// Specialists depend on this trait rather than on a concrete loop so tests
/// and alternative hosts can substitute their own.
#[async_trait]
pub trait ThreadAffinityExecutor: Send + Sync {
    /// Run `task` on the owning thread and wait (without blocking the async
    /// worker) for its result. Panics inside `task` come back as `Err`.
    async fn run_on_owner(&self, task: OwnerTask) -> Result<String, String>;
}

/// The run loop. Construct it on (or hand it to) the thread that owns the document.
pub struct OwnerLoop {
    receiver: mpsc::UnboundedReceiver<OwnerEvent>,
    handle: OwnerHandle,
    stopped: bool,
}

impl Default for OwnerLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnerLoop {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            receiver,
            handle: OwnerHandle {
                sender,
                owner: Arc::new(OnceCell::new()),
            },
            stopped: false,
        }
    }

    pub fn handle(&self) -> OwnerHandle {
        self.handle.clone()
    }

    /// Bind the loop to the calling thread. The first thread to pump the loop owns it.
    fn claim(&self) {
        let current = std::thread::current().id();
        let owner = *self.handle.owner.get_or_init(|| current);
        if owner != current {
            log::warn!("[OWNER] Loop pumped from a thread other than its owner");
        }
    }

    /// Process tasks until `OwnerHandle::stop` is called. Blocks the calling thread.
    pub fn run(mut self) {
        self.claim();
        log::info!("[OWNER] Event loop running");
        while let Some(event) = self.receiver.blocking_recv() {
            match event {
                OwnerEvent::Run(task) => Self::execute(task),
                OwnerEvent::Stop => break,
            }
        }
        log::info!("[OWNER] Event loop stopped");
    }

    /// Run every task queued so far, including tasks those tasks post, then return.
    /// Returns how many tasks ran.
    pub fn run_pending(&mut self) -> usize {
        if self.stopped {
            return 0;
        }
        self.claim();
        let mut ran = 0;
        while let Ok(event) = self.receiver.try_recv() {
            match event {
                OwnerEvent::Run(task) => {
                    Self::execute(task);
                    ran += 1;
                }
                OwnerEvent::Stop => {
                    self.stopped = true;
                    break;
                }
            }
        }
        ran
    }

    fn execute(task: Posted) {
        // A failing task must never take the event loop down with it
        if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
            log::error!("[OWNER] Posted task {}", panic_message(payload.as_ref()));
        }
    }
}

/// Cloneable, thread-safe handle used to reach the owning thread.
#[derive(Clone)]
pub struct OwnerHandle {
    sender: mpsc::UnboundedSender<OwnerEvent>,
    owner: Arc<OnceCell<ThreadId>>,
}

impl OwnerHandle {
    /// Queue `task` behind everything already posted. Returns false if the loop is gone.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.sender.send(OwnerEvent::Run(Box::new(task))).is_err() {
            log::warn!("[OWNER] Dropping task: event loop has shut down");
            return false;
        }
        true
    }

    /// Whether the calling thread is the one pumping the loop.
    pub fn is_owner_thread(&self) -> bool {
        self.owner
            .get()
            .is_some_and(|id| *id == std::thread::current().id())
    }

    /// Ask the loop to exit after the tasks already queued ahead of this request.
    pub fn stop(&self) {
        let _ = self.sender.send(OwnerEvent::Stop);
    }

    /// Blocking flavour of `run_on_owner` for plain threads (never call from async code).
    pub fn call_blocking(&self, task: OwnerTask) -> Result<String, String> {
        if self.is_owner_thread() {
            return guarded(task);
        }
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        let posted = self.post(move || {
            let _ = tx.send(guarded(task));
        });
        if !posted {
            return Err(crate::errors::CoordError::OwnerUnavailable.to_string());
        }
        rx.recv()
            .unwrap_or_else(|_| Err(crate::errors::CoordError::OwnerUnavailable.to_string()))
    }
}

#[async_trait]
impl ThreadAffinityExecutor for OwnerHandle {
    async fn run_on_owner(&self, task: OwnerTask) -> Result<String, String> {
        // Already on the owner: posting and waiting would deadlock
        if self.is_owner_thread() {
            return guarded(task);
        }
        let (tx, rx) = oneshot::channel();
        let posted = self.post(move || {
            let _ = tx.send(guarded(task));
        });
        if !posted {
            return Err(crate::errors::CoordError::OwnerUnavailable.to_string());
        }
        // Sender dropped without a value means the loop stopped before reaching us
        rx.await
            .unwrap_or_else(|_| Err(crate::errors::CoordError::OwnerUnavailable.to_string()))
    }
}

fn guarded(task: OwnerTask) -> Result<String, String> {
    match catch_unwind(AssertUnwindSafe(task)) {
        Ok(result) => result,
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_posted_tasks_run_in_fifo_order() {
        let mut owner = OwnerLoop::new();
        let handle = owner.handle();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let seen = seen.clone();
            handle.post(move || seen.lock().push(i));
        }

        assert_eq!(owner.run_pending(), 5);
        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_tasks_posted_from_tasks_run_later() {
        let mut owner = OwnerLoop::new();
        let handle = owner.handle();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner_handle = handle.clone();
        let inner_seen = seen.clone();
        handle.post(move || {
            inner_seen.lock().push("outer");
            let nested = inner_seen.clone();
            inner_handle.post(move || nested.lock().push("nested"));
        });
        let tail = seen.clone();
        handle.post(move || tail.lock().push("tail"));

        owner.run_pending();
        assert_eq!(*seen.lock(), vec!["outer", "tail", "nested"]);
    }

    #[test]
    fn test_panicking_task_does_not_stop_loop() {
        let mut owner = OwnerLoop::new();
        let handle = owner.handle();
        let ran = Arc::new(Mutex::new(false));

        handle.post(|| panic!("bad task"));
        let flag = ran.clone();
        handle.post(move || *flag.lock() = true);

        assert_eq!(owner.run_pending(), 2);
        assert!(*ran.lock());
    }

    #[test]
    fn test_is_owner_thread() {
        let mut owner = OwnerLoop::new();
        let handle = owner.handle();
        assert!(!handle.is_owner_thread());

        owner.run_pending();
        assert!(handle.is_owner_thread());

        let remote = handle.clone();
        let from_other = std::thread::spawn(move || remote.is_owner_thread())
            .join()
            .unwrap();
        assert!(!from_other);
    }

    #[test]
    fn test_call_blocking_from_worker_thread() {
        let owner = OwnerLoop::new();
        let handle = owner.handle();
        let owner_thread = std::thread::spawn(move || owner.run());

        let check = handle.clone();
        let result = handle.call_blocking(Box::new(move || {
            assert!(check.is_owner_thread());
            Ok("done".to_string())
        }));
        assert_eq!(result, Ok("done".to_string()));

        let failed =
            handle.call_blocking(Box::new(|| -> Result<String, String> { panic!("nope") }));
        assert_eq!(failed, Err("panicked: nope".to_string()));

        handle.stop();
        owner_thread.join().unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_on_owner_marshals_result() {
        let owner = OwnerLoop::new();
        let handle = owner.handle();
        let owner_thread = std::thread::spawn(move || owner.run());

        let check = handle.clone();
        let result = handle
            .run_on_owner(Box::new(move || {
                if check.is_owner_thread() {
                    Ok("on owner".to_string())
                } else {
                    Err("wrong thread".to_string())
                }
            }))
            .await;
        assert_eq!(result, Ok("on owner".to_string()));

        let error = handle
            .run_on_owner(Box::new(|| Err("tool failed".to_string())))
            .await;
        assert_eq!(error, Err("tool failed".to_string()));

        handle.stop();
        owner_thread.join().unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_on_owner_after_shutdown() {
        let owner = OwnerLoop::new();
        let handle = owner.handle();
        drop(owner);

        let result = handle.run_on_owner(Box::new(|| Ok("never".to_string()))).await;
        assert_eq!(result, Err("Owning thread is not running".to_string()));
    }
}
