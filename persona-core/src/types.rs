//! Core type definitions shared across the persona engine.
//!
//! All types are serializable so the surrounding store can persist them as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier for a companion character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    /// Create a new random character ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a knowledge base ("world book").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KnowledgeBaseId(pub Uuid);

impl KnowledgeBaseId {
    /// Create a new random knowledge-base ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for KnowledgeBaseId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a single world-book entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    /// Create a new random entry ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for KnowledgeBaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human on the other side of the conversation.
    User,
    /// The companion character.
    Assistant,
    /// Out-of-band instructions; not a conversational turn.
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// One of the two conversational parties, used for blame attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    /// The human.
    User,
    /// The companion.
    Assistant,
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// When the message was sent.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message with an explicit role.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }

    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::User, content, timestamp)
    }

    /// Create an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::Assistant, content, timestamp)
    }

    /// Create a system message.
    #[must_use]
    pub fn system(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::System, content, timestamp)
    }

    /// The conversational party behind this message, if any.
    #[must_use]
    pub fn party(&self) -> Option<Party> {
        match self.role {
            Role::User => Some(Party::User),
            Role::Assistant => Some(Party::Assistant),
            Role::System => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Affect
// ---------------------------------------------------------------------------

/// The five tracked basic emotions.
///
/// Declaration order is the tie-break policy: when two emotions share the
/// maximum value, the one listed first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emotion {
    /// Happiness, delight.
    Joy,
    /// Irritation, rage.
    Anger,
    /// Sorrow, melancholy.
    Sadness,
    /// Worry, anxiety.
    Fear,
    /// Reliance, closeness.
    Trust,
}

impl Emotion {
    /// All emotions in tie-break order.
    pub const ALL: [Emotion; 5] = [
        Emotion::Joy,
        Emotion::Anger,
        Emotion::Sadness,
        Emotion::Fear,
        Emotion::Trust,
    ];
}

/// Five-dimensional affect state plus an aggregate friendship score.
///
/// Each emotion ranges 0–100. Missing fields deserialize to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionVector {
    /// Joy (0–100).
    pub joy: u8,
    /// Anger (0–100).
    pub anger: u8,
    /// Sadness (0–100).
    pub sadness: u8,
    /// Fear (0–100).
    pub fear: u8,
    /// Trust (0–100).
    pub trust: u8,
    /// Aggregate bond score maintained by the conversation pipeline.
    pub friendship_score: i32,
}

impl EmotionVector {
    /// Create an emotion vector, clamping each axis to 0–100.
    #[must_use]
    pub fn new(joy: u8, anger: u8, sadness: u8, fear: u8, trust: u8) -> Self {
        Self {
            joy: joy.min(100),
            anger: anger.min(100),
            sadness: sadness.min(100),
            fear: fear.min(100),
            trust: trust.min(100),
            friendship_score: 0,
        }
    }

    /// Builder-style setter for the friendship score.
    #[must_use]
    pub fn with_friendship(mut self, friendship_score: i32) -> Self {
        self.friendship_score = friendship_score;
        self
    }

    /// Value of one emotion axis.
    #[must_use]
    pub fn get(&self, emotion: Emotion) -> u8 {
        match emotion {
            Emotion::Joy => self.joy,
            Emotion::Anger => self.anger,
            Emotion::Sadness => self.sadness,
            Emotion::Fear => self.fear,
            Emotion::Trust => self.trust,
        }
    }

    /// The strongest emotion among `candidates`, ties going to the earlier one.
    ///
    /// Returns `None` only for an empty candidate list.
    #[must_use]
    pub fn strongest_of(&self, candidates: &[Emotion]) -> Option<(Emotion, u8)> {
        let mut best: Option<(Emotion, u8)> = None;
        for &emotion in candidates {
            let value = self.get(emotion);
            match best {
                Some((_, top)) if value <= top => {}
                _ => best = Some((emotion, value)),
            }
        }
        best
    }

    /// The dominant emotion over all five axes.
    #[must_use]
    pub fn dominant(&self) -> (Emotion, u8) {
        self.strongest_of(&Emotion::ALL).unwrap_or((Emotion::Joy, self.joy))
    }
}

// ---------------------------------------------------------------------------
// Personality Traits
// ---------------------------------------------------------------------------

/// Personality traits of a character. Each ranges 0.0–1.0.
///
/// The built-in relationship table does not consult them; they are passed to
/// every rule predicate so custom rules can.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalityTraits {
    /// How readily the character warms up to people (0 = aloof, 1 = affectionate).
    pub warmth: f32,
    /// How guarded the character is about romance (0 = open, 1 = guarded).
    pub guardedness: f32,
    /// How strongly events swing the character's feelings (0 = stoic, 1 = volatile).
    pub volatility: f32,
}

impl Default for PersonalityTraits {
    fn default() -> Self {
        Self {
            warmth: 0.5,
            guardedness: 0.5,
            volatility: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emotion_vector_clamps_axes() {
        let v = EmotionVector::new(250, 101, 100, 0, 42);
        assert_eq!(v.joy, 100);
        assert_eq!(v.anger, 100);
        assert_eq!(v.trust, 42);
    }

    #[test]
    fn dominant_prefers_earlier_emotion_on_tie() {
        let v = EmotionVector::new(70, 70, 10, 70, 70);
        assert_eq!(v.dominant(), (Emotion::Joy, 70));

        let v = EmotionVector::new(10, 20, 80, 80, 80);
        assert_eq!(v.dominant(), (Emotion::Sadness, 80));
    }

    #[test]
    fn missing_emotion_fields_default_to_zero() {
        let v: EmotionVector = serde_json::from_str(r#"{"joy": 65}"#).expect("parse");
        assert_eq!(v.joy, 65);
        assert_eq!(v.anger, 0);
        assert_eq!(v.friendship_score, 0);
    }

    #[test]
    fn system_messages_have_no_party() {
        let now = Utc::now();
        assert_eq!(Message::system("rules", now).party(), None);
        assert_eq!(Message::user("hi", now).party(), Some(Party::User));
    }
}
