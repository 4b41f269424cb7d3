//! Request and response types shared by every backend.

use serde::{Deserialize, Serialize};

/// Author of a chat message, as the backend sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions and context.
    System,
    /// The human.
    User,
    /// The character.
    Assistant,
}

/// One message of the outbound conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: ChatRole,
    /// Text.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// An assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParams {
    /// Model name.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// A function the model may call instead of answering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    /// Function name.
    pub name: String,
    /// What the function does, for the model.
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// A full generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// Conversation, oldest first; the system block comes first.
    pub messages: Vec<ChatMessage>,
    /// Sampling parameters.
    pub params: GenerationParams,
    /// Tools offered to the model.
    pub tools: Vec<ToolDeclaration>,
}

/// A structured function call returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Function name.
    pub name: String,
    /// Arguments object.
    pub arguments: serde_json::Value,
}

/// What the model produced.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResponse {
    /// A plain reply.
    Text(String),
    /// A tool call.
    ToolCall(ToolInvocation),
}

/// Input to a summariser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRequest {
    /// Summary produced by the previous call, if any.
    pub prior_summary: Option<String>,
    /// Messages to fold in, oldest first.
    pub messages: Vec<ChatMessage>,
}
