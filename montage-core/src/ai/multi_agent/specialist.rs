//! A specialist: one bounded tool-calling loop over its own tool set

use super::types::{SubAgent, SubAgentCall};
use crate::ai::{LanguageModel, Message, ToolCall, ToolHistoryEntry, ToolResponse};
use crate::config::DEFAULT_SPECIALIST_MAX_ITERATIONS;
use crate::document::AgentContext;
use crate::errors::CoordError;
use crate::owner::ThreadAffinityExecutor;
use crate::tools::{ToolContext, ToolRegistry};
use async_trait::async_trait;
use std::sync::Arc;

pub struct Specialist {
    name: String,
    domain: String,
    system_prompt: String,
    model: Arc<dyn LanguageModel>,
    tools: ToolRegistry,
    agent_context: AgentContext,
    max_iterations: usize,
    unavailable: Option<String>,
}

impl Specialist {
    pub fn new(
        name: impl Into<String>,
        domain: impl Into<String>,
        model: Arc<dyn LanguageModel>,
        agent_context: AgentContext,
    ) -> Self {
        let name = name.into();
        let domain = domain.into();
        let system_prompt = format!(
            "You are the {} specialist of a video editor. Your domain: {}. \
             Use your tools to carry out the task, then reply with a short summary.",
            name, domain
        );
        Self {
            name,
            domain,
            system_prompt,
            model,
            tools: ToolRegistry::new(),
            agent_context,
            max_iterations: DEFAULT_SPECIALIST_MAX_ITERATIONS,
            unavailable: None,
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Mark an optional capability whose dependency is missing
    pub fn unavailable(mut self, reason: impl Into<String>) -> Self {
        self.unavailable = Some(reason.into());
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    async fn execute_tool_calls(
        &self,
        tool_calls: &[ToolCall],
        context: &ToolContext,
        runner: &dyn ThreadAffinityExecutor,
    ) -> Vec<ToolResponse> {
        let mut responses = Vec::with_capacity(tool_calls.len());

        for call in tool_calls {
            let start = std::time::Instant::now();
            let result = self
                .tools
                .execute(&call.name, call.arguments.clone(), context, runner)
                .await;

            log::info!(
                "[SPECIALIST] {} ran '{}' in {}ms, success: {}",
                self.name,
                call.name,
                start.elapsed().as_millis(),
                result.success
            );

            responses.push(if result.success {
                ToolResponse::success(call.id.clone(), result.content)
            } else {
                ToolResponse::error(call.id.clone(), result.content)
            });
        }

        responses
    }
}

/// What the specialist reports when it runs out of iterations
fn partial_answer(
    name: &str,
    limit: usize,
    last_content: &str,
    history: &[ToolHistoryEntry],
) -> String {
    if !last_content.is_empty() {
        return last_content.to_string();
    }
    let steps: Vec<String> = history
        .iter()
        .flat_map(|entry| entry.tool_calls.iter().zip(entry.tool_responses.iter()))
        .map(|(call, response)| {
            format!("{} ({})", call.name, if response.is_error { "failed" } else { "ok" })
        })
        .collect();
    format!(
        "{} stopped after {} iterations without a final answer. Steps taken: {}",
        name,
        limit,
        if steps.is_empty() { "none".to_string() } else { steps.join(", ") }
    )
}

#[async_trait]
impl SubAgent for Specialist {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> &str {
        &self.domain
    }

    fn availability(&self) -> Result<(), String> {
        match &self.unavailable {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    async fn run(&self, call: SubAgentCall) -> Result<String, CoordError> {
        let context = ToolContext::new()
            .with_agent(self.name.clone())
            .with_turn(call.turn_id.clone());
        let tools = self.tools.definitions();

        let mut conversation = Vec::with_capacity(call.messages.len() + 1);
        conversation.push(Message::system(self.system_prompt.clone()));
        conversation.extend(call.messages);

        let mut tool_history: Vec<ToolHistoryEntry> = Vec::new();
        let mut last_content = String::new();

        // Document edits made from here until the guard drops are queued
        let _window = self.agent_context.enter();

        for iteration in 1..=self.max_iterations {
            log::debug!("[SPECIALIST] {} iteration {} starting", self.name, iteration);

            let response = self
                .model
                .generate_with_tools(&call.model, &conversation, &tool_history, &tools)
                .await
                .map_err(CoordError::Model)?;

            if !response.content.is_empty() {
                last_content = response.content.clone();
            }

            if !response.wants_tools() {
                log::info!(
                    "[SPECIALIST] {} finished after {} iteration(s)",
                    self.name,
                    iteration
                );
                return Ok(response.content);
            }

            let tool_responses = self
                .execute_tool_calls(&response.tool_calls, &context, call.runner.as_ref())
                .await;
            tool_history.push(ToolHistoryEntry::new(response.tool_calls, tool_responses));
        }

        log::warn!(
            "[SPECIALIST] {} hit the iteration limit ({})",
            self.name,
            self.max_iterations
        );
        Ok(partial_answer(
            &self.name,
            self.max_iterations,
            &last_content,
            &tool_history,
        ))
    }
}
