//! Runtime error type.

use persona_core::PersonaError;
use persona_llm::LlmError;
use thiserror::Error;

/// Errors surfaced by the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Failure inside the state engine or its store.
    #[error(transparent)]
    Core(#[from] PersonaError),

    /// Failure talking to the response backend.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// Invalid or incomplete runtime configuration.
    #[error("Runtime configuration error: {0}")]
    Config(String),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, RuntimeError>;
