//! The character record: identity plus every piece of evolving state.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{MoodConfig, SummaryConfig};
use crate::display::{DisplayInput, DisplayResolver, DisplayState};
use crate::error::{PersonaError, Result};
use crate::mood::MoodState;
use crate::relationship::{RelationshipClassifier, RelationshipState, RelationshipStatus};
use crate::schedule::Schedule;
use crate::types::{CharacterId, EmotionVector, KnowledgeBaseId, Message, PersonalityTraits};

/// A persistent companion character.
///
/// Mood, relationship and emotions are mutated in place for the whole life of
/// the character. History is append-only and chronological.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Identifier.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Persona description used as the base of the system prompt.
    #[serde(default)]
    pub persona: String,
    /// Current mood.
    #[serde(default)]
    pub mood: MoodState,
    /// Relationship scores and status memory.
    #[serde(default)]
    pub relationship: RelationshipState,
    /// Current emotions.
    #[serde(default)]
    pub emotions: EmotionVector,
    /// Personality traits.
    #[serde(default)]
    pub traits: PersonalityTraits,
    /// Knowledge bases consulted when building prompts.
    #[serde(default)]
    pub enabled_world_books: Vec<KnowledgeBaseId>,
    /// Pending follow-ups.
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    history: Vec<Message>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    summarized_until: usize,
}

impl Character {
    /// A new character with baseline state.
    #[must_use]
    pub fn new(name: impl Into<String>, persona: impl Into<String>) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            persona: persona.into(),
            mood: MoodState::default(),
            relationship: RelationshipState::new(),
            emotions: EmotionVector::default(),
            traits: PersonalityTraits::default(),
            enabled_world_books: Vec::new(),
            schedule: Schedule::default(),
            history: Vec::new(),
            summary: None,
            summarized_until: 0,
        }
    }

    /// A new character whose starting energy comes from `mood.default_energy`.
    #[must_use]
    pub fn with_mood_config(
        name: impl Into<String>,
        persona: impl Into<String>,
        mood: &MoodConfig,
    ) -> Self {
        Self {
            mood: MoodState::baseline(mood.default_energy),
            ..Self::new(name, persona)
        }
    }

    // -- history ------------------------------------------------------------

    /// Full history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Append a message.
    ///
    /// # Errors
    /// Returns [`PersonaError::OutOfOrderMessage`] if `message` is older than
    /// the newest message already recorded.
    pub fn push_message(&mut self, message: Message) -> Result<()> {
        if let Some(last) = self.history.last() {
            if message.timestamp < last.timestamp {
                return Err(PersonaError::OutOfOrderMessage {
                    timestamp: message.timestamp.to_rfc3339(),
                    last: last.timestamp.to_rfc3339(),
                });
            }
        }
        self.history.push(message);
        Ok(())
    }

    // -- relationship & badge ----------------------------------------------

    /// Store new relationship scores and advance the status state machine.
    pub fn apply_scores(
        &mut self,
        romance: i32,
        friendship: i32,
        classifier: &RelationshipClassifier,
    ) -> RelationshipStatus {
        self.relationship
            .advance(romance, friendship, &self.traits, classifier)
    }

    /// Resolver input for wall-clock time `now` in `tz`.
    #[must_use]
    pub fn display_input(&self, now: DateTime<Utc>, tz: Tz) -> DisplayInput {
        DisplayInput {
            energy: self.mood.energy_level,
            status: self.mood.status,
            emotions: self.emotions,
            friendship_score: self.emotions.friendship_score,
            local_hour: now.with_timezone(&tz).hour(),
        }
    }

    /// The on-screen badge.
    #[must_use]
    pub fn badge(&self, resolver: &DisplayResolver, now: DateTime<Utc>, tz: Tz) -> DisplayState {
        resolver.resolve(&self.display_input(now, tz))
    }

    // -- summarisation bookkeeping ----------------------------------------

    /// The rolling summary of folded history, if any.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Messages not yet covered by the summary.
    #[must_use]
    pub fn unsummarized(&self) -> &[Message] {
        self.history.get(self.summarized_until..).unwrap_or_default()
    }

    /// Whether enough unsummarised history has built up to fold some of it.
    #[must_use]
    pub fn needs_summary(&self, config: &SummaryConfig) -> bool {
        self.unsummarized().len() >= config.trigger_len
    }

    /// The oldest unsummarised messages, leaving `config.window` verbatim.
    #[must_use]
    pub fn summary_candidates(&self, config: &SummaryConfig) -> &[Message] {
        let pending = self.unsummarized();
        let fold = pending.len().saturating_sub(config.window);
        &pending[..fold]
    }

    /// Replace the summary after folding the next `folded` messages into it.
    pub fn record_summary(&mut self, summary: impl Into<String>, folded: usize) {
        self.summarized_until = (self.summarized_until + folded).min(self.history.len());
        self.summary = Some(summary.into());
        debug!(
            character = %self.id,
            summarized_until = self.summarized_until,
            "Summary recorded"
        );
    }
}
