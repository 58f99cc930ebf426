//! In-memory document with snapshot-based undo/redo
//!
//! Stands in for the host's document manager in the headless binary and tests.

use super::types::DocumentSink;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

type Entries = BTreeMap<String, Value>;

#[derive(Default)]
struct DocumentState {
    entries: Entries,
    undo: Vec<Entries>,
    redo: Vec<Entries>,
}

impl DocumentState {
    fn checkpoint(&mut self) {
        self.undo.push(self.entries.clone());
        self.redo.clear();
    }
}

#[derive(Default)]
pub struct InMemoryDocument {
    state: Mutex<DocumentState>,
}

impl InMemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.lock().entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The whole document as a JSON object
    pub fn snapshot(&self) -> Value {
        let state = self.state.lock();
        Value::Object(state.entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    pub fn can_undo(&self) -> bool {
        !self.state.lock().undo.is_empty()
    }
}

impl DocumentSink for InMemoryDocument {
    fn insert(&self, key: &str, values: Value) -> Result<(), String> {
        let mut state = self.state.lock();
        if state.entries.contains_key(key) {
            return Err(format!("'{}' already exists", key));
        }
        state.checkpoint();
        state.entries.insert(key.to_string(), values);
        Ok(())
    }

    fn update(&self, key: &str, values: Value) -> Result<(), String> {
        let mut state = self.state.lock();
        if !state.entries.contains_key(key) {
            return Err(format!("'{}' not found", key));
        }
        state.checkpoint();
        let Some(current) = state.entries.get_mut(key) else {
            return Err(format!("'{}' not found", key));
        };
        // Objects merge field by field, anything else is replaced
        match (current, values) {
            (Value::Object(existing), Value::Object(changes)) => {
                for (field, value) in changes {
                    existing.insert(field, value);
                }
            }
            (slot, replacement) => *slot = replacement,
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), String> {
        let mut state = self.state.lock();
        if !state.entries.contains_key(key) {
            return Err(format!("'{}' not found", key));
        }
        state.checkpoint();
        state.entries.remove(key);
        Ok(())
    }

    fn load(&self, values: Value, reset_history: bool) -> Result<(), String> {
        let entries: Map<String, Value> = match values {
            Value::Object(map) => map,
            other => return Err(format!("load expects an object, got {}", other)),
        };
        let mut state = self.state.lock();
        if reset_history {
            state.undo.clear();
            state.redo.clear();
        } else {
            state.checkpoint();
        }
        state.entries = entries.into_iter().collect();
        Ok(())
    }

    fn undo(&self) -> Result<bool, String> {
        let mut state = self.state.lock();
        match state.undo.pop() {
            Some(previous) => {
                let current = std::mem::replace(&mut state.entries, previous);
                state.redo.push(current);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn redo(&self) -> Result<bool, String> {
        let mut state = self.state.lock();
        match state.redo.pop() {
            Some(next) => {
                let current = std::mem::replace(&mut state.entries, next);
                state.undo.push(current);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn get(&self, key: &str) -> Option<Value> {
        InMemoryDocument::get(self, key)
    }
}
