//! Document mutation surface and captured mutation actions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::IntoStaticStr;

/// The document-mutation sink owned by the host (e.g. its document/undo manager).
///
/// Calls are order-sensitive in effect. Implementations must fail fast: a call
/// either applies or returns `Err`, it never blocks waiting on other threads.
pub trait DocumentSink: Send + Sync {
    fn insert(&self, key: &str, values: Value) -> Result<(), String>;
    fn update(&self, key: &str, values: Value) -> Result<(), String>;
    fn delete(&self, key: &str) -> Result<(), String>;
    fn load(&self, values: Value, reset_history: bool) -> Result<(), String>;

    /// Returns false when there was nothing to undo
    fn undo(&self) -> Result<bool, String>;
    /// Returns false when there was nothing to redo
    fn redo(&self) -> Result<bool, String>;

    /// Read one entry. Sinks that do not serve reads return `None`.
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }
}

/// A captured, replayable document edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MutationAction {
    Insert { key: String, values: Value },
    Update { key: String, values: Value },
    Delete { key: String },
    Load { values: Value, reset_history: bool },
}

impl MutationAction {
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// Document path this action targets (empty for whole-document loads)
    pub fn key(&self) -> &str {
        match self {
            MutationAction::Insert { key, .. }
            | MutationAction::Update { key, .. }
            | MutationAction::Delete { key } => key,
            MutationAction::Load { .. } => "",
        }
    }

    /// Apply this action to `sink`, consuming it.
    pub fn apply(self, sink: &dyn DocumentSink) -> Result<(), String> {
        match self {
            MutationAction::Insert { key, values } => sink.insert(&key, values),
            MutationAction::Update { key, values } => sink.update(&key, values),
            MutationAction::Delete { key } => sink.delete(&key),
            MutationAction::Load {
                values,
                reset_history,
            } => sink.load(values, reset_history),
        }
    }
}
