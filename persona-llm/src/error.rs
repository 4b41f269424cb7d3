//! LLM error types.

use thiserror::Error;

/// Errors that can occur while talking to a model backend.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    /// The backend answered with a non-success status.
    #[error("LLM backend returned HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The response could not be interpreted.
    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    /// A tool call did not match its declaration.
    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidToolCall {
        /// Tool name.
        tool: String,
        /// What was wrong.
        reason: String,
    },

    /// Request timed out.
    #[error("LLM request timed out after {0}ms")]
    Timeout(u64),

    /// No backend is reachable or configured.
    #[error("LLM provider unavailable: {0}")]
    Unavailable(String),

    /// Configuration error.
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(0)
        } else if err.is_connect() {
            LlmError::Unavailable(err.to_string())
        } else if err.is_decode() {
            LlmError::ParseError(err.to_string())
        } else {
            LlmError::RequestFailed(err.to_string())
        }
    }
}
