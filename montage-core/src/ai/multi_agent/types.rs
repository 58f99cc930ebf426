//! Multi-agent system types

use crate::ai::Message;
use crate::errors::CoordError;
use crate::owner::ThreadAffinityExecutor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// One specialist invocation, owned by the invoker for the call's lifetime
#[derive(Clone)]
pub struct SubAgentCall {
    pub agent: String,
    pub model: String,
    pub messages: Vec<Message>,
    /// Marshals owner-affine tool bodies onto the document-owning thread
    pub runner: Arc<dyn ThreadAffinityExecutor>,
    /// Shared by every call made during one user turn
    pub turn_id: String,
}

impl SubAgentCall {
    pub fn new(
        agent: impl Into<String>,
        model: impl Into<String>,
        messages: Vec<Message>,
        runner: Arc<dyn ThreadAffinityExecutor>,
    ) -> Self {
        Self {
            agent: agent.into(),
            model: model.into(),
            messages,
            runner,
            turn_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_turn(mut self, turn_id: impl Into<String>) -> Self {
        self.turn_id = turn_id.into();
        self
    }
}

impl std::fmt::Debug for SubAgentCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubAgentCall")
            .field("agent", &self.agent)
            .field("model", &self.model)
            .field("messages", &self.messages.len())
            .field("turn_id", &self.turn_id)
            .finish()
    }
}

/// Outcome of one specialist invocation. Errors are already rendered as
/// `"Error: {detail}"` so they can be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialistResult {
    pub agent: String,
    pub output: Result<String, String>,
}

impl SpecialistResult {
    pub fn success(agent: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            output: Ok(output.into()),
        }
    }

    pub fn failure(agent: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self {
            agent: agent.into(),
            output: Err(format!("Error: {}", detail)),
        }
    }

    /// Map a routing error to a result. A missing capability degrades to a
    /// readable answer; anything else is a failure.
    pub fn from_error(agent: impl Into<String>, error: &CoordError) -> Self {
        match error {
            CoordError::UnavailableCapability(..) => Self::success(agent, error.to_string()),
            other => Self::failure(agent, other),
        }
    }

    pub fn is_success(&self) -> bool {
        self.output.is_ok()
    }

    /// Output or rendered error, whichever this is
    pub fn text(&self) -> &str {
        match &self.output {
            Ok(text) | Err(text) => text,
        }
    }
}

/// Anything the invoker can run as a specialist
#[async_trait]
pub trait SubAgent: Send + Sync {
    fn name(&self) -> &str;

    /// One-line description of the domain, shown to the supervisor
    fn domain(&self) -> &str;

    /// `Err(reason)` when an optional dependency is missing
    fn availability(&self) -> Result<(), String> {
        Ok(())
    }

    async fn run(&self, call: SubAgentCall) -> Result<String, CoordError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_rendering() {
        let failed = SpecialistResult::failure("color", "model overloaded");
        assert_eq!(failed.text(), "Error: model overloaded");
        assert!(!failed.is_success());

        let unknown =
            SpecialistResult::from_error("colr", &CoordError::UnknownRoute("colr".to_string()));
        assert_eq!(unknown.text(), "Error: Unknown specialist 'colr'");

        let missing = SpecialistResult::from_error(
            "voice",
            &CoordError::UnavailableCapability("voice".to_string(), "no tts engine".to_string()),
        );
        assert!(missing.is_success());
        assert_eq!(missing.text(), "voice is not available: no tts engine");
    }
}
