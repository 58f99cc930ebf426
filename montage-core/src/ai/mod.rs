pub mod multi_agent;
pub mod scripted;
pub mod types;

pub use scripted::ScriptedModel;
pub use types::{AiResponse, ToolCall, ToolHistoryEntry, ToolResponse};

use crate::tools::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// A language-model provider.
///
/// Opaque request/response: given a model id, the conversation, the tool
/// rounds so far and the tool set, return text or tool calls. Retries are the
/// provider's business.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate_with_tools(
        &self,
        model: &str,
        messages: &[Message],
        tool_history: &[ToolHistoryEntry],
        tools: &[ToolDefinition],
    ) -> Result<AiResponse, String>;
}
