//! Error types for pipeline agents.
//!
//! These errors never leave a step: every agent converts them into a
//! recovered outcome carrying documented defaults.

use thiserror::Error;

/// Errors that can occur inside an agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Error from the LLM provider.
    #[error("LLM error: {0}")]
    LlmError(String),

    /// The model answered with text that is not the expected JSON.
    #[error("Failed to parse LLM response: {0}")]
    ResponseParseError(String),

    /// The model answered with JSON of the wrong shape or with empty content.
    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    /// The step did not finish within its time budget.
    #[error("Agent operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The step panicked.
    #[error("Agent panicked: {0}")]
    Panicked(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<crate::error::LlmError> for AgentError {
    fn from(err: crate::error::LlmError) -> Self {
        AgentError::LlmError(err.to_string())
    }
}

impl From<crate::utils::JsonExtractionError> for AgentError {
    fn from(err: crate::utils::JsonExtractionError) -> Self {
        AgentError::ResponseParseError(err.to_string())
    }
}

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;
