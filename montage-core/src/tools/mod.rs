pub mod builtin;
pub mod registry;
pub mod types;

pub use registry::{Tool, ToolRegistry};
pub use types::{
    PropertySchema, ThreadAffinity, ToolContext, ToolDefinition, ToolGroup, ToolInputSchema,
    ToolResult,
};

use crate::document::DocumentSink;
use std::sync::Arc;

/// Registry holding the built-in document tools bound to `sink`
pub fn create_document_registry(sink: Arc<dyn DocumentSink>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in builtin::DocumentEntryTool::all(sink) {
        registry.register(tool);
    }
    registry
}
