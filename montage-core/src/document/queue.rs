//! FIFO queue that drains agent-originated mutations onto the owning thread
//!
//! Actions are applied strictly one at a time. Each drain step is a separate
//! zero-delay task on the owning loop, so a long burst of agent edits
//! interleaves with other UI work instead of starving it.
//!
//! Delivery is at-most-once: an action whose application fails is logged and
//! dropped, and draining continues with the next one.

use super::types::{DocumentSink, MutationAction};
use crate::errors::{panic_message, CoordError};
use crate::owner::OwnerHandle;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct DrainState {
    actions: VecDeque<MutationAction>,
    /// A drain step is posted to the owning loop and has not run yet
    scheduled: bool,
    /// An action is being applied right now
    draining: bool,
}

struct QueueInner {
    sink: Arc<dyn DocumentSink>,
    owner: OwnerHandle,
    state: Mutex<DrainState>,
    applied: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Clone)]
pub struct MutationQueue {
    inner: Arc<QueueInner>,
}

impl MutationQueue {
    pub fn new(sink: Arc<dyn DocumentSink>, owner: OwnerHandle) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                sink,
                owner,
                state: Mutex::new(DrainState::default()),
                applied: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Append an action and make sure a drain step is on its way. Callable from any thread.
    pub fn enqueue(&self, action: MutationAction) {
        let schedule = {
            let mut state = self.inner.state.lock();
            log::debug!(
                "[MUTATION_QUEUE] Queued {} '{}' ({} pending)",
                action.kind(),
                action.key(),
                state.actions.len() + 1
            );
            state.actions.push_back(action);
            // While an action is applying, the drain step re-arms itself when done
            if state.scheduled || state.draining {
                false
            } else {
                state.scheduled = true;
                true
            }
        };
        if schedule {
            self.inner.schedule();
        }
    }

    /// Apply the front action. Runs on the owning thread; a no-op when another
    /// application is in flight or nothing is queued.
    pub fn drain_one(&self) {
        self.inner.drain_one();
    }

    pub fn pending(&self) -> usize {
        self.inner.state.lock().actions.len()
    }

    /// Nothing queued, nothing applying, no drain step outstanding
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock();
        state.actions.is_empty() && !state.scheduled && !state.draining
    }

    pub fn applied_count(&self) -> u64 {
        self.inner.applied.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

impl QueueInner {
    fn schedule(self: &Arc<Self>) {
        let inner = self.clone();
        if !self.owner.post(move || inner.drain_one()) {
            log::error!("[MUTATION_QUEUE] Owning loop is gone, queued actions will not drain");
            self.state.lock().scheduled = false;
        }
    }

    fn drain_one(self: &Arc<Self>) {
        let action = {
            let mut state = self.state.lock();
            state.scheduled = false;
            if state.draining {
                return;
            }
            match state.actions.pop_front() {
                Some(action) => {
                    state.draining = true;
                    action
                }
                None => return,
            }
        };

        if !self.owner.is_owner_thread() {
            log::warn!("[MUTATION_QUEUE] Draining off the owning thread");
        }

        let kind = action.kind();
        let key = action.key().to_string();
        let outcome = match catch_unwind(AssertUnwindSafe(|| action.apply(self.sink.as_ref()))) {
            Ok(result) => result,
            Err(payload) => Err(panic_message(payload.as_ref())),
        };

        match outcome {
            Ok(()) => {
                self.applied.fetch_add(1, Ordering::Relaxed);
            }
            Err(message) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                let error = CoordError::MutationApply {
                    kind: kind.to_string(),
                    key,
                    message,
                };
                log::error!("[MUTATION_QUEUE] {} (action dropped)", error);
            }
        }

        let reschedule = {
            let mut state = self.state.lock();
            state.draining = false;
            if !state.actions.is_empty() && !state.scheduled {
                state.scheduled = true;
                true
            } else {
                false
            }
        };
        if reschedule {
            self.schedule();
        }
    }
}
