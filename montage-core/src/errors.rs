//! Error taxonomy for the coordination layer
//!
//! None of these are allowed to cross a thread boundary as a panic. Every
//! handoff (job delivery, owner-thread calls, specialist collection) turns
//! them into plain values first.

use std::any::Any;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordError {
    /// Raised inside a submitted job
    #[error("Job '{id}' failed: {message}")]
    TransientJob { id: String, message: String },

    /// Raised while applying a queued mutation; the action is dropped
    #[error("Failed to apply {kind} on '{key}': {message}")]
    MutationApply {
        kind: String,
        key: String,
        message: String,
    },

    #[error("Specialist '{0}' timed out after {1:?}")]
    SpecialistTimeout(String, Duration),

    #[error("{0} is not available: {1}")]
    UnavailableCapability(String, String),

    #[error("Unknown specialist '{0}'")]
    UnknownRoute(String),

    /// The owning thread's loop has stopped, so nothing can be marshalled to it
    #[error("Owning thread is not running")]
    OwnerUnavailable,

    /// Language-model collaborator failure
    #[error("Model error: {0}")]
    Model(String),
}

impl CoordError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::TransientJob { .. } | Self::SpecialistTimeout(..) | Self::Model(_) => true,
            Self::MutationApply { .. }
            | Self::UnavailableCapability(..)
            | Self::UnknownRoute(_)
            | Self::OwnerUnavailable => false,
        }
    }
}

/// Extract a readable message from a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        assert_eq!(
            CoordError::UnknownRoute("color".to_string()).to_string(),
            "Unknown specialist 'color'"
        );
        assert_eq!(
            CoordError::SpecialistTimeout("manim".to_string(), Duration::from_secs(120))
                .to_string(),
            "Specialist 'manim' timed out after 120s"
        );
        assert_eq!(
            CoordError::UnavailableCapability(
                "voice".to_string(),
                "tts backend missing".to_string()
            )
            .to_string(),
            "voice is not available: tts backend missing"
        );
    }

    #[test]
    fn test_recoverable() {
        let timeout = CoordError::SpecialistTimeout("a".to_string(), Duration::from_secs(1));
        assert!(timeout.is_recoverable());
        assert!(!CoordError::UnknownRoute("a".to_string()).is_recoverable());
        assert!(!CoordError::OwnerUnavailable.is_recoverable());
    }

    #[test]
    fn test_panic_message() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "panicked: boom");
    }
}
