//! Document entry tools
//!
//! Thin adapters from model tool calls to the document surface. They all run
//! on the owning thread. When handed a `MutationRouter`, edits made during an
//! agent turn are queued rather than applied in place, and the tool reports
//! them as accepted.

use crate::document::DocumentSink;
use crate::tools::registry::Tool;
use crate::tools::types::{
    PropertySchema, ThreadAffinity, ToolContext, ToolDefinition, ToolGroup, ToolInputSchema,
    ToolResult,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOp {
    Insert,
    Update,
    Delete,
    Read,
}

impl EntryOp {
    fn tool_name(self) -> &'static str {
        match self {
            EntryOp::Insert => "insert_entry",
            EntryOp::Update => "update_entry",
            EntryOp::Delete => "delete_entry",
            EntryOp::Read => "read_entry",
        }
    }
}

#[derive(Debug, Deserialize)]
struct EntryParams {
    key: String,
    #[serde(default)]
    values: Option<Value>,
}

/// One document operation exposed as a tool
pub struct DocumentEntryTool {
    op: EntryOp,
    sink: Arc<dyn DocumentSink>,
    definition: ToolDefinition,
}

impl DocumentEntryTool {
    pub fn insert(sink: Arc<dyn DocumentSink>) -> Self {
        Self::new(
            EntryOp::Insert,
            sink,
            "Add a new entry (clip, track, effect...) to the document. Fails if the key exists.",
        )
    }

    pub fn update(sink: Arc<dyn DocumentSink>) -> Self {
        Self::new(
            EntryOp::Update,
            sink,
            "Change fields of an existing entry. Object values are merged field by field.",
        )
    }

    pub fn delete(sink: Arc<dyn DocumentSink>) -> Self {
        Self::new(EntryOp::Delete, sink, "Remove an entry from the document.")
    }

    pub fn read(sink: Arc<dyn DocumentSink>) -> Self {
        Self::new(EntryOp::Read, sink, "Read the current value of an entry.")
    }

    /// All four tools sharing one sink
    pub fn all(sink: Arc<dyn DocumentSink>) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(Self::insert(sink.clone())),
            Arc::new(Self::update(sink.clone())),
            Arc::new(Self::delete(sink.clone())),
            Arc::new(Self::read(sink)),
        ]
    }

    fn new(op: EntryOp, sink: Arc<dyn DocumentSink>, description: &str) -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "key".to_string(),
            PropertySchema::string("Document path of the entry (e.g., 'clip1', 'track/2')"),
        );
        let mut required = vec!["key".to_string()];

        if matches!(op, EntryOp::Insert | EntryOp::Update) {
            properties.insert(
                "values".to_string(),
                PropertySchema::object("Field values for the entry"),
            );
            required.push("values".to_string());
        }

        DocumentEntryTool {
            op,
            sink,
            definition: ToolDefinition {
                name: op.tool_name().to_string(),
                description: description.to_string(),
                input_schema: ToolInputSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required,
                },
                group: ToolGroup::Document,
            },
        }
    }
}

impl Tool for DocumentEntryTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn affinity(&self) -> ThreadAffinity {
        ThreadAffinity::Owner
    }

    fn invoke(&self, params: Value, context: &ToolContext) -> ToolResult {
        let params: EntryParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(format!("Invalid parameters: {}", e)),
        };

        let outcome = match self.op {
            EntryOp::Read => {
                return match self.sink.get(&params.key) {
                    Some(value) => ToolResult::success(value.to_string()),
                    None => ToolResult::error(format!("Entry '{}' not found", params.key)),
                };
            }
            EntryOp::Delete => self.sink.delete(&params.key),
            EntryOp::Insert | EntryOp::Update => {
                let Some(values) = params.values else {
                    return ToolResult::error(format!(
                        "Invalid parameters: {} requires 'values'",
                        self.op.tool_name()
                    ));
                };
                if self.op == EntryOp::Insert {
                    self.sink.insert(&params.key, values)
                } else {
                    self.sink.update(&params.key, values)
                }
            }
        };

        match outcome {
            Ok(()) => {
                log::debug!(
                    "[TOOLS] {} accepted {} '{}'",
                    context.agent_name(),
                    self.op.tool_name(),
                    params.key
                );
                ToolResult::success(format!("{} '{}' accepted", self.op.tool_name(), params.key))
            }
            Err(e) => ToolResult::error(format!(
                "{} '{}' failed: {}",
                self.op.tool_name(),
                params.key,
                e
            )),
        }
    }
}
