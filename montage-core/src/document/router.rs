//! Routes document mutations either straight to the sink or through the
//! mutation queue, depending on whether an agent turn is in progress.

use super::queue::MutationQueue;
use super::types::{DocumentSink, MutationAction};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Default)]
struct ContextState {
    /// Raised by `set(true)`, independent of any guards
    forced: bool,
    depth: usize,
    /// Bumped by a forced clear so guards opened before it stop counting
    generation: u64,
}

impl ContextState {
    fn is_active(&self) -> bool {
        self.forced || self.depth > 0
    }
}

/// Process-wide "an agent is running" flag.
///
/// Specialists hold an [`AgentContextGuard`] for the length of their tool loop.
/// Guards nest, so two specialists running in parallel keep the flag raised
/// until both have finished. A flag raised with `set(true)` stays up until
/// `set(false)`, whatever guards come and go in between.
#[derive(Clone, Default)]
pub struct AgentContext {
    state: Arc<Mutex<ContextState>>,
}

impl AgentContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().is_active()
    }

    /// Force the flag. Clearing it also forgets any open guards.
    pub fn set(&self, active: bool) {
        let mut state = self.state.lock();
        state.forced = active;
        if !active {
            state.depth = 0;
            state.generation += 1;
        }
        log::debug!("[ROUTER] Agent context set to {}", active);
    }

    /// Raise the flag until the returned guard is dropped
    pub fn enter(&self) -> AgentContextGuard {
        let mut state = self.state.lock();
        state.depth += 1;
        AgentContextGuard {
            context: self.clone(),
            generation: state.generation,
        }
    }
}

#[must_use = "the agent context is cleared as soon as the guard is dropped"]
pub struct AgentContextGuard {
    context: AgentContext,
    generation: u64,
}

impl Drop for AgentContextGuard {
    fn drop(&mut self) {
        let mut state = self.context.state.lock();
        // A forced clear already released this guard
        if state.generation != self.generation {
            return;
        }
        state.depth = state.depth.saturating_sub(1);
    }
}

/// The document surface agents and the UI both talk to.
///
/// With the agent context inactive every call goes straight to the sink and
/// its result is returned. With it active, mutating calls are captured as
/// [`MutationAction`]s and queued; the call returns `Ok(())` immediately and
/// the edit lands later on the owning thread. Undo, redo and reads always go
/// straight through.
pub struct MutationRouter {
    sink: Arc<dyn DocumentSink>,
    queue: MutationQueue,
    context: AgentContext,
}

impl MutationRouter {
    pub fn new(sink: Arc<dyn DocumentSink>, queue: MutationQueue, context: AgentContext) -> Self {
        Self {
            sink,
            queue,
            context,
        }
    }

    pub fn set_agent_context(&self, active: bool) {
        self.context.set(active);
    }

    pub fn agent_context(&self) -> &AgentContext {
        &self.context
    }

    pub fn queue(&self) -> &MutationQueue {
        &self.queue
    }

    pub fn sink(&self) -> &Arc<dyn DocumentSink> {
        &self.sink
    }

    fn route(&self, action: MutationAction) -> Result<(), String> {
        if self.context.is_active() {
            self.queue.enqueue(action);
            Ok(())
        } else {
            action.apply(self.sink.as_ref())
        }
    }
}

impl DocumentSink for MutationRouter {
    fn insert(&self, key: &str, values: Value) -> Result<(), String> {
        self.route(MutationAction::Insert {
            key: key.to_string(),
            values,
        })
    }

    fn update(&self, key: &str, values: Value) -> Result<(), String> {
        self.route(MutationAction::Update {
            key: key.to_string(),
            values,
        })
    }

    fn delete(&self, key: &str) -> Result<(), String> {
        self.route(MutationAction::Delete {
            key: key.to_string(),
        })
    }

    fn load(&self, values: Value, reset_history: bool) -> Result<(), String> {
        self.route(MutationAction::Load {
            values,
            reset_history,
        })
    }

    fn undo(&self) -> Result<bool, String> {
        self.sink.undo()
    }

    fn redo(&self) -> Result<bool, String> {
        self.sink.redo()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.sink.get(key)
    }
}
