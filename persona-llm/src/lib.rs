//! # persona-llm: response generation and summarisation backends
//!
//! The state engine only produces context; turning it into a reply is the
//! job of a language model behind one of two seams:
//!
//! - [`ResponseGenerator`]: ordered messages + parameters + optional tool
//!   declarations in, plain text or a tool invocation out.
//! - [`Summarizer`]: a window of recent messages + the prior summary in, an
//!   updated summary out.
//!
//! [`LlmClient`] implements both for OpenAI-compatible and Ollama endpoints.
//! Every call is a single attempt bounded by a timeout; retrying is left to
//! the caller.

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod prompt;
pub mod tools;
pub mod types;

use async_trait::async_trait;

pub use client::{LlmClient, LlmProvider};
pub use error::LlmError;
pub use types::{
    ChatMessage, ChatRole, GenerationParams, GenerationRequest, GenerationResponse, SummaryRequest,
    ToolDeclaration, ToolInvocation,
};

/// Produces the character's next reply.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate a reply for `request`.
    ///
    /// # Errors
    /// Backend failures (unavailable, timeout, malformed response).
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError>;
}

/// Compresses older history into a running summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Return the updated summary.
    ///
    /// # Errors
    /// Backend failures (unavailable, timeout, malformed response).
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, LlmError>;
}
