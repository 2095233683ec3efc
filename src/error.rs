//! Error types shared by the session, relay and HTTP layers

use thiserror::Error;

/// Failures surfaced to the UI action handler.
///
/// None of these are retried internally; the session is left as it was so the
/// user can resubmit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Missing or invalid credential (or other unusable setting)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Completion requested with nothing to send
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Any failure returned by a remote provider (network, quota, malformed response)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Operation referenced a chat or session that does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ChatError {
    pub fn missing_api_key() -> Self {
        ChatError::Configuration("Please provide an API key.".to_string())
    }

    pub fn chat_not_found(chat_id: &str) -> Self {
        ChatError::NotFound(format!("Chat {} not found", chat_id))
    }
}

/// Result type alias for chat operations
pub type Result<T> = std::result::Result<T, ChatError>;
