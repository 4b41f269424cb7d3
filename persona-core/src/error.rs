//! Error types for the persona core library.

use thiserror::Error;

/// Top-level error type for all persona-core operations.
///
/// The state resolvers themselves are total; only invariant-enforcing
/// constructors, configuration loading and persistence can fail.
#[derive(Error, Debug)]
pub enum PersonaError {
    /// A keyword-strategy world-book entry was created without any usable key.
    #[error("Keyword entry has no keys: {content_preview}")]
    EmptyKeywordEntry {
        /// First characters of the entry content, for locating it.
        content_preview: String,
    },

    /// A message was appended with a timestamp older than the newest one.
    #[error("Message out of order: {timestamp} is earlier than last message at {last}")]
    OutOfOrderMessage {
        /// Timestamp of the rejected message (RFC 3339).
        timestamp: String,
        /// Timestamp of the newest message already in history (RFC 3339).
        last: String,
    },

    /// A character with the given ID was not found.
    #[error("Character not found: {0}")]
    CharacterNotFound(crate::CharacterId),

    /// A knowledge base with the given ID was not found.
    #[error("Knowledge base not found: {0}")]
    KnowledgeBaseNotFound(crate::KnowledgeBaseId),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, PersonaError>;
