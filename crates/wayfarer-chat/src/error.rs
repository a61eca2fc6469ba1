//! Error types for the conversational interface.

use wayfarer_core::error::WayfarerError;

/// Errors from the chat engine.
///
/// Only input validation errors escape [`TripOrchestrator::handle_turn`];
/// model and retrieval failures are degraded into a well-formed turn.
///
/// [`TripOrchestrator::handle_turn`]: crate::orchestrator::TripOrchestrator::handle_turn
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("LLM error: {0}")]
    LlmError(String),
    #[error("retrieval error: {0}")]
    RetrievalError(String),
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl ChatError {
    /// True for errors caused by the caller's input rather than a dependency.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ChatError::EmptyMessage | ChatError::MessageTooLong(_))
    }
}

impl From<WayfarerError> for ChatError {
    fn from(err: WayfarerError) -> Self {
        match err {
            WayfarerError::Config(msg) => ChatError::ConfigError(msg),
            WayfarerError::Llm(msg) | WayfarerError::Auth(msg) => ChatError::LlmError(msg),
            other => ChatError::RetrievalError(other.to_string()),
        }
    }
}
