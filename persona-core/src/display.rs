//! Display-state resolver: the one-line badge shown next to a character.
//!
//! Mood status, energy, the emotion vector, the friendship score and the
//! local hour are merged by an ordered rule table. Each rule either produces a
//! [`DisplayKind`] or passes; the first rule that produces one wins. Every
//! kind maps to a fixed text/color/emoji triple.
//!
//! The resolver has no state: resolving the same input twice always yields the
//! same badge.

use serde::Serialize;

use crate::mood::MoodStatus;
use crate::types::{Emotion, EmotionVector};

/// Emotions above this value count as "strong".
const STRONG_EMOTION: u8 = 60;

/// Inputs to the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInput {
    /// Energy level, 0–100.
    pub energy: u8,
    /// Physiological status.
    pub status: MoodStatus,
    /// Current emotions.
    pub emotions: EmotionVector,
    /// Aggregate bond score.
    pub friendship_score: i32,
    /// Local hour, 0–23.
    pub local_hour: u32,
}

impl Default for DisplayInput {
    fn default() -> Self {
        Self {
            energy: 80,
            status: MoodStatus::Awake,
            emotions: EmotionVector::default(),
            friendship_score: 0,
            local_hour: 12,
        }
    }
}

/// Every badge the resolver can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayKind {
    /// Asleep and sad.
    RestlessSleep,
    /// Asleep and happy.
    SweetDreams,
    /// Asleep.
    Asleep,
    /// Out of energy.
    Exhausted,
    /// Morning wake-up.
    WakingUp,
    /// After-lunch slump.
    PostLunchDrowsy,
    /// Low energy, angry.
    Cranky,
    /// Low energy, sad.
    Drained,
    /// Low energy, afraid.
    Anxious,
    /// Low energy.
    LowBattery,
    /// High energy, angry.
    FiredUp,
    /// High energy, joyful.
    Ecstatic,
    /// High energy.
    Energetic,
    /// Joy dominates.
    Happy,
    /// Anger dominates.
    Angry,
    /// Sadness dominates.
    Sad,
    /// Fear dominates.
    Scared,
    /// Trust dominates and the bond is strong.
    Attached,
    /// Trust dominates but the bond is weak.
    Trusting,
    /// Nothing special, plenty of energy.
    Online,
    /// Nothing special.
    Idle,
}

impl DisplayKind {
    /// Whether this badge belongs to the sleep branch.
    #[must_use]
    pub fn is_sleep(self) -> bool {
        matches!(self, Self::RestlessSleep | Self::SweetDreams | Self::Asleep)
    }

    /// Fixed `(text, color, emoji)` triple.
    #[must_use]
    pub fn presentation(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::RestlessSleep => ("Tossing and turning", "#5b5f97", "😣"),
            Self::SweetDreams => ("Sweet dreams", "#8e7dbe", "😴"),
            Self::Asleep => ("Sleeping", "#6c757d", "💤"),
            Self::Exhausted => ("Exhausted", "#495057", "😵"),
            Self::WakingUp => ("Just woke up", "#f4a261", "🥱"),
            Self::PostLunchDrowsy => ("Post-lunch drowsy", "#e9c46a", "😪"),
            Self::Cranky => ("Cranky", "#d62828", "😤"),
            Self::Drained => ("Drained", "#457b9d", "😞"),
            Self::Anxious => ("Anxious", "#7b2cbf", "😰"),
            Self::LowBattery => ("Low battery", "#adb5bd", "🪫"),
            Self::FiredUp => ("Fired up", "#e63946", "🔥"),
            Self::Ecstatic => ("Over the moon", "#ffb703", "🤩"),
            Self::Energetic => ("Full of energy", "#2a9d8f", "⚡"),
            Self::Happy => ("Happy", "#ffd166", "😊"),
            Self::Angry => ("Annoyed", "#ef476f", "😠"),
            Self::Sad => ("Feeling down", "#118ab2", "😢"),
            Self::Scared => ("Uneasy", "#6a4c93", "😨"),
            Self::Attached => ("Can't stop thinking of you", "#ff70a6", "🥰"),
            Self::Trusting => ("Feeling safe", "#06d6a0", "🤝"),
            Self::Online => ("Online", "#38b000", "🟢"),
            Self::Idle => ("Idle", "#ced4da", "⚪"),
        }
    }
}

/// The resolved badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    /// Which branch produced it.
    pub kind: DisplayKind,
    /// Badge text.
    pub text: &'static str,
    /// Badge color as a CSS hex string.
    pub color: &'static str,
    /// Badge icon.
    pub emoji: &'static str,
}

impl From<DisplayKind> for DisplayState {
    fn from(kind: DisplayKind) -> Self {
        let (text, color, emoji) = kind.presentation();
        Self {
            kind,
            text,
            color,
            emoji,
        }
    }
}

/// One row of the resolver table.
#[derive(Debug, Clone, Copy)]
pub struct DisplayRule {
    /// Rule name, for tracing and tests.
    pub name: &'static str,
    /// Returns a badge if the rule applies.
    pub apply: fn(&DisplayInput) -> Option<DisplayKind>,
}

/// Ordered display rules.
#[derive(Debug, Clone)]
pub struct DisplayResolver {
    rules: Vec<DisplayRule>,
}

impl Default for DisplayResolver {
    fn default() -> Self {
        Self::standard()
    }
}

impl DisplayResolver {
    /// The standard priority cascade.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            rules: vec![
                DisplayRule { name: "physiological", apply: physiological },
                DisplayRule { name: "time_of_day", apply: time_of_day },
                DisplayRule { name: "low_energy", apply: low_energy },
                DisplayRule { name: "high_energy", apply: high_energy },
                DisplayRule { name: "dominant_emotion", apply: dominant_emotion },
            ],
        }
    }

    /// The rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[DisplayRule] {
        &self.rules
    }

    /// Resolve the badge for `input`.
    #[must_use]
    pub fn resolve(&self, input: &DisplayInput) -> DisplayState {
        self.rules
            .iter()
            .find_map(|rule| (rule.apply)(input))
            .unwrap_or_else(|| baseline(input))
            .into()
    }
}

fn physiological(input: &DisplayInput) -> Option<DisplayKind> {
    if input.status == MoodStatus::Sleeping {
        let kind = if input.emotions.sadness > STRONG_EMOTION {
            DisplayKind::RestlessSleep
        } else if input.emotions.joy > STRONG_EMOTION {
            DisplayKind::SweetDreams
        } else {
            DisplayKind::Asleep
        };
        return Some(kind);
    }
    (input.status == MoodStatus::Exhausted || input.energy < 10).then_some(DisplayKind::Exhausted)
}

fn time_of_day(input: &DisplayInput) -> Option<DisplayKind> {
    let hour = input.local_hour;
    if (6..10).contains(&hour) && input.energy > 60 && input.energy < 90 {
        return Some(DisplayKind::WakingUp);
    }
    if (13..16).contains(&hour) && input.energy > 40 && input.energy < 70 {
        return Some(DisplayKind::PostLunchDrowsy);
    }
    None
}

fn low_energy(input: &DisplayInput) -> Option<DisplayKind> {
    if input.energy >= 40 {
        return None;
    }
    let kind = match input
        .emotions
        .strongest_of(&[Emotion::Anger, Emotion::Sadness, Emotion::Fear])
    {
        Some((Emotion::Anger, v)) if v > STRONG_EMOTION => DisplayKind::Cranky,
        Some((Emotion::Sadness, v)) if v > STRONG_EMOTION => DisplayKind::Drained,
        Some((Emotion::Fear, v)) if v > STRONG_EMOTION => DisplayKind::Anxious,
        _ => DisplayKind::LowBattery,
    };
    Some(kind)
}

fn high_energy(input: &DisplayInput) -> Option<DisplayKind> {
    if input.energy <= 80 {
        return None;
    }
    let kind = if input.emotions.anger > 70 {
        DisplayKind::FiredUp
    } else if input.emotions.joy > 80 {
        DisplayKind::Ecstatic
    } else {
        DisplayKind::Energetic
    };
    Some(kind)
}

fn dominant_emotion(input: &DisplayInput) -> Option<DisplayKind> {
    let (emotion, value) = input.emotions.dominant();
    if value <= STRONG_EMOTION {
        return None;
    }
    Some(match emotion {
        Emotion::Joy => DisplayKind::Happy,
        Emotion::Anger => DisplayKind::Angry,
        Emotion::Sadness => DisplayKind::Sad,
        Emotion::Fear => DisplayKind::Scared,
        Emotion::Trust if input.friendship_score > 40 => DisplayKind::Attached,
        Emotion::Trust => DisplayKind::Trusting,
    })
}

fn baseline(input: &DisplayInput) -> DisplayKind {
    if input.energy > 60 {
        DisplayKind::Online
    } else {
        DisplayKind::Idle
    }
}
