//! Supervisor: routes a user turn to specialists and aggregates their answers
//!
//! ```text
//! user turn → supervisor loop ─┬─ 1 call  → invoke_one  (current task)
//!                              └─ N calls → invoke_many (pool, per-call timeout)
//!                                   ↓
//!                      results fed back as tool responses, in call order
//! ```

use super::invoker::ParallelInvoker;
use super::tools::{routing_instructions, supervisor_tools, target_specialist};
use super::types::{SpecialistResult, SubAgentCall};
use crate::ai::{LanguageModel, Message, MessageRole, ToolCall, ToolHistoryEntry, ToolResponse};
use crate::config::{Config, DEFAULT_SUPERVISOR_MAX_ITERATIONS};
use crate::errors::CoordError;
use crate::owner::ThreadAffinityExecutor;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

pub const FOLLOW_UP_NOTE: &str =
    "Some parts of this request are not done yet; they will be picked up in a follow-up turn.";

/// What one user turn produced
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub turn_id: String,
    pub response: String,
    /// Every specialist result of the turn, in dispatch order
    pub results: Vec<SpecialistResult>,
    pub iterations: usize,
    /// False when the turn stopped early and left work for a follow-up
    pub completed: bool,
}

pub struct AgentRouter {
    model: Arc<dyn LanguageModel>,
    invoker: ParallelInvoker,
    runner: Arc<dyn ThreadAffinityExecutor>,
    supervisor_model: String,
    specialist_model: String,
    max_iterations: usize,
}

impl AgentRouter {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        invoker: ParallelInvoker,
        runner: Arc<dyn ThreadAffinityExecutor>,
    ) -> Self {
        let defaults = Config::default();
        Self {
            model,
            invoker,
            runner,
            supervisor_model: defaults.supervisor_model,
            specialist_model: defaults.specialist_model,
            max_iterations: DEFAULT_SUPERVISOR_MAX_ITERATIONS,
        }
    }

    pub fn with_config(mut self, config: &Config) -> Self {
        self.supervisor_model = config.supervisor_model.clone();
        self.specialist_model = config.specialist_model.clone();
        self.max_iterations = config.supervisor_max_iterations.max(1);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn invoker(&self) -> &ParallelInvoker {
        &self.invoker
    }

    /// Run one user turn to completion. Never fails: problems surface as text.
    pub async fn handle_turn(&self, messages: Vec<Message>) -> TurnOutcome {
        let turn_id = Uuid::new_v4().to_string();
        let registry = self.invoker.registry().clone();
        let tools = supervisor_tools(&registry);

        let mut conversation = Vec::with_capacity(messages.len() + 1);
        conversation.push(Message::system(routing_instructions(&registry)));
        conversation.extend(messages);
        let fallback_task = conversation
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let mut tool_history: Vec<ToolHistoryEntry> = Vec::new();
        let mut results: Vec<SpecialistResult> = Vec::new();

        for iteration in 1..=self.max_iterations {
            log::info!("[SUPERVISOR] Turn {} iteration {}", turn_id, iteration);

            let response = match self
                .model
                .generate_with_tools(&self.supervisor_model, &conversation, &tool_history, &tools)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    let error = CoordError::Model(e);
                    log::error!("[SUPERVISOR] {}", error);
                    let response = if results.is_empty() {
                        format!("Error: {}", error)
                    } else {
                        format!("{}\n\n{}", aggregate(&results), FOLLOW_UP_NOTE)
                    };
                    return TurnOutcome {
                        turn_id,
                        response,
                        results,
                        iterations: iteration,
                        completed: false,
                    };
                }
            };

            if !response.wants_tools() {
                let text = if response.content.is_empty() {
                    aggregate(&results)
                } else {
                    response.content
                };
                return TurnOutcome {
                    turn_id,
                    response: text,
                    results,
                    iterations: iteration,
                    completed: true,
                };
            }

            let round = self
                .dispatch(&response.tool_calls, &turn_id, &fallback_task)
                .await;
            let tool_responses = response
                .tool_calls
                .iter()
                .zip(round.iter())
                .map(|(call, result)| match &result.output {
                    Ok(text) => ToolResponse::success(call.id.clone(), text.clone()),
                    Err(text) => ToolResponse::error(call.id.clone(), text.clone()),
                })
                .collect();
            tool_history.push(ToolHistoryEntry::new(response.tool_calls, tool_responses));
            results.extend(round);
        }

        log::warn!(
            "[SUPERVISOR] Turn {} hit the iteration limit ({})",
            turn_id,
            self.max_iterations
        );
        TurnOutcome {
            turn_id,
            response: format!("{}\n\n{}", aggregate(&results), FOLLOW_UP_NOTE),
            results,
            iterations: self.max_iterations,
            completed: false,
        }
    }

    /// One supervisor round: a lone call runs inline, several go through the pool
    async fn dispatch(
        &self,
        tool_calls: &[ToolCall],
        turn_id: &str,
        fallback_task: &str,
    ) -> Vec<SpecialistResult> {
        let mut calls: Vec<SubAgentCall> = tool_calls
            .iter()
            .map(|tc| {
                let task = tc
                    .arguments
                    .get("task")
                    .and_then(|t| t.as_str())
                    .unwrap_or(fallback_task);
                SubAgentCall::new(
                    target_specialist(&tc.name),
                    self.specialist_model.clone(),
                    vec![Message::user(task)],
                    self.runner.clone(),
                )
                .with_turn(turn_id)
            })
            .collect();

        log::info!(
            "[SUPERVISOR] Routing to: {}",
            calls
                .iter()
                .map(|c| c.agent.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        if calls.len() == 1 {
            if let Some(call) = calls.pop() {
                return vec![self.invoker.invoke_one(call).await];
            }
        }
        self.invoker.invoke_many(calls).await
    }
}

/// Concatenate results in the order they were dispatched
pub fn aggregate(results: &[SpecialistResult]) -> String {
    results
        .iter()
        .map(|r| format!("[{}] {}", r.agent, r.text()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
