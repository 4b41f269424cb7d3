//! World books: named collections of lore spliced into the prompt.
//!
//! An entry is activated either unconditionally (`Constant`) or when one of
//! its keys appears in the text being answered (`Keyword`). Keys match as
//! case-insensitive substrings.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::error::{PersonaError, Result};
use crate::types::{EntryId, KnowledgeBaseId};

/// How an entry is activated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Always injected; keys are ignored.
    Constant,
    /// Injected when any key occurs in the text.
    #[default]
    Keyword,
}

/// A single lore entry.
///
/// Construct through [`WorldBookEntry::constant`] or [`WorldBookEntry::keyword`];
/// the latter rejects entries without a usable key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldBookEntry {
    /// Entry identifier.
    pub id: EntryId,
    /// Trigger keys. Ignored for constant entries.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Lore text.
    pub content: String,
    /// Activation strategy.
    #[serde(default)]
    pub strategy: Strategy,
}

impl WorldBookEntry {
    /// An always-on entry.
    #[must_use]
    pub fn constant(content: impl Into<String>) -> Self {
        Self {
            id: EntryId::new(),
            keys: Vec::new(),
            content: content.into(),
            strategy: Strategy::Constant,
        }
    }

    /// A keyword-triggered entry.
    ///
    /// # Errors
    /// Returns [`PersonaError::EmptyKeywordEntry`] if every key is blank.
    pub fn keyword<I, S>(keys: I, content: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = Self {
            id: EntryId::new(),
            keys: keys.into_iter().map(Into::into).collect(),
            content: content.into(),
            strategy: Strategy::Keyword,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Check the keyword invariant; used after deserialising stored entries.
    ///
    /// # Errors
    /// Returns [`PersonaError::EmptyKeywordEntry`] for a keyword entry with no usable key.
    pub fn validate(&self) -> Result<()> {
        if self.strategy == Strategy::Keyword && !self.keys.iter().any(|k| !k.trim().is_empty()) {
            return Err(PersonaError::EmptyKeywordEntry {
                content_preview: self.content.chars().take(40).collect(),
            });
        }
        Ok(())
    }

    /// Whether this entry fires for already-lowercased `text`.
    fn matches_lowercase(&self, text: &str) -> bool {
        match self.strategy {
            Strategy::Constant => true,
            Strategy::Keyword => self.keys.iter().any(|key| {
                let key = key.trim();
                !key.is_empty() && text.contains(key.to_lowercase().as_str())
            }),
        }
    }
}

/// A named world book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    /// Identifier referenced by characters.
    pub id: KnowledgeBaseId,
    /// Display name.
    pub name: String,
    /// Entries in authoring order.
    #[serde(default)]
    pub entries: Vec<WorldBookEntry>,
}

impl KnowledgeBase {
    /// An empty knowledge base.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: KnowledgeBaseId::new(),
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Builder-style entry append.
    #[must_use]
    pub fn with_entry(mut self, entry: WorldBookEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Validate every entry.
    ///
    /// # Errors
    /// Returns the first entry validation error.
    pub fn validate(&self) -> Result<()> {
        self.entries.iter().try_for_each(WorldBookEntry::validate)
    }
}

/// Entries relevant to `text` from the enabled knowledge bases.
///
/// Knowledge bases not listed in `enabled` are skipped entirely. The result is
/// in knowledge-base order then entry order, each entry at most once.
#[must_use]
pub fn retrieve<'a>(
    text: &str,
    knowledge_bases: &'a [KnowledgeBase],
    enabled: &[KnowledgeBaseId],
) -> Vec<&'a WorldBookEntry> {
    if enabled.is_empty() {
        return Vec::new();
    }

    let lowered = text.to_lowercase();
    let mut seen = HashSet::new();
    let hits: Vec<&WorldBookEntry> = knowledge_bases
        .iter()
        .filter(|kb| enabled.contains(&kb.id))
        .flat_map(|kb| kb.entries.iter())
        .filter(|entry| entry.matches_lowercase(&lowered))
        .filter(|entry| seen.insert(entry.id))
        .collect();

    debug!(
        enabled = enabled.len(),
        retrieved = hits.len(),
        "World-book lookup"
    );
    hits
}
