//! Scripted language model
//!
//! Replays canned responses per model id, in order. Drives the headless host
//! and the agent tests without a network provider.

use super::{AiResponse, LanguageModel, Message, ToolHistoryEntry};
use crate::tools::ToolDefinition;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

struct Step {
    delay: Option<Duration>,
    reply: Result<AiResponse, String>,
}

/// What the model was asked, recorded for assertions
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub last_message: Option<String>,
    pub tool_rounds: usize,
    pub tool_names: Vec<String>,
}

#[derive(Default)]
pub struct ScriptedModel {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fallbacks: Mutex<HashMap<String, AiResponse>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, model: &str, step: Step) -> Self {
        self.scripts
            .lock()
            .entry(model.to_string())
            .or_default()
            .push_back(step);
        self
    }

    pub fn respond(self, model: &str, response: AiResponse) -> Self {
        self.push(
            model,
            Step {
                delay: None,
                reply: Ok(response),
            },
        )
    }

    /// Reply only after `delay` has passed (simulates a slow provider)
    pub fn respond_after(self, model: &str, delay: Duration, response: AiResponse) -> Self {
        self.push(
            model,
            Step {
                delay: Some(delay),
                reply: Ok(response),
            },
        )
    }

    pub fn fail(self, model: &str, message: &str) -> Self {
        self.push(
            model,
            Step {
                delay: None,
                reply: Err(message.to_string()),
            },
        )
    }

    /// Served every time the script for `model` has run dry
    pub fn fallback(self, model: &str, response: AiResponse) -> Self {
        self.fallbacks.lock().insert(model.to_string(), response);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, model: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.model == model).count()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate_with_tools(
        &self,
        model: &str,
        messages: &[Message],
        tool_history: &[ToolHistoryEntry],
        tools: &[ToolDefinition],
    ) -> Result<AiResponse, String> {
        self.calls.lock().push(RecordedCall {
            model: model.to_string(),
            last_message: messages.last().map(|m| m.content.clone()),
            tool_rounds: tool_history.len(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
        });

        let step = self
            .scripts
            .lock()
            .get_mut(model)
            .and_then(|script| script.pop_front());

        let Some(step) = step else {
            let fallback = self.fallbacks.lock().get(model).cloned();
            return fallback
                .ok_or_else(|| format!("No scripted response left for model '{}'", model));
        };

        if let Some(delay) = step.delay {
            tokio::time::sleep(delay).await;
        }
        step.reply
    }
}
