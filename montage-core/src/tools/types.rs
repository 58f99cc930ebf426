use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Tool groups, used to describe what a tool touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolGroup {
    /// Reads or edits the shared document
    #[default]
    Document,
    /// Hands work to another agent
    Agents,
    /// Pure computation, no shared state
    System,
}

impl ToolGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolGroup::Document => "document",
            ToolGroup::Agents => "agents",
            ToolGroup::System => "system",
        }
    }
}

/// Where a tool's body is allowed to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThreadAffinity {
    /// Any thread, inline on the calling agent's task
    #[default]
    Any,
    /// Only the document-owning thread
    Owner,
}

/// JSON Schema property definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl PropertySchema {
    pub fn string(description: impl Into<String>) -> Self {
        Self::of_type("string", description)
    }

    pub fn object(description: impl Into<String>) -> Self {
        Self::of_type("object", description)
    }

    pub fn of_type(schema_type: &str, description: impl Into<String>) -> Self {
        PropertySchema {
            schema_type: schema_type.to_string(),
            description: description.into(),
            default: None,
            items: None,
            enum_values: None,
        }
    }
}

/// Tool input schema using JSON Schema format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: HashMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for ToolInputSchema {
    fn default() -> Self {
        ToolInputSchema {
            schema_type: "object".to_string(),
            properties: HashMap::new(),
            required: vec![],
        }
    }
}

/// Tool definition that gets sent to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
    #[serde(skip)]
    pub group: ToolGroup,
}

/// Result of tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        ToolResult {
            success: true,
            content: content.into(),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let msg = message.into();
        ToolResult {
            success: false,
            content: msg.clone(),
            error: Some(msg),
        }
    }

    /// Flatten to the string-or-error-string pair that crosses thread boundaries
    pub fn into_outcome(self) -> Result<String, String> {
        if self.success {
            Ok(self.content)
        } else {
            Err(self.error.unwrap_or(self.content))
        }
    }

    pub fn from_outcome(outcome: Result<String, String>) -> Self {
        match outcome {
            Ok(content) => ToolResult::success(content),
            Err(message) => ToolResult::error(message),
        }
    }
}

/// Context provided to tools during execution
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Agent issuing the call (specialist or supervisor name)
    pub agent: Option<String>,
    /// Identifier shared by every call made during one user turn
    pub turn_id: Option<String>,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn with_turn(mut self, turn_id: impl Into<String>) -> Self {
        self.turn_id = Some(turn_id.into());
        self
    }

    pub fn agent_name(&self) -> &str {
        self.agent.as_deref().unwrap_or("unknown")
    }
}
