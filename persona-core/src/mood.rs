//! Circadian Mood Clock: "How awake am I?"
//!
//! The character's local hour selects one of a fixed set of disjoint
//! circadian bands. Each band names a mood, a short description, a
//! physiological status and an energy target. Every tick nudges energy toward
//! the target by a bounded step, so the on-screen value drifts instead of
//! snapping.
//!
//! The clock is the single writer of [`MoodState`]. External overrides
//! (a gift, a scripted event) go through [`MoodClock::apply_override`], which
//! shares the same commit rule as a tick: if neither label, status nor energy
//! (within tolerance) changed, the result is [`MoodTick::Unchanged`] and no
//! update notification should be emitted.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::config::MoodConfig;

/// Physiological status of the character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoodStatus {
    /// Up and about.
    #[default]
    Awake,
    /// Awake but sluggish.
    Drowsy,
    /// Asleep; overrides every other display signal.
    Sleeping,
    /// Out of energy while awake.
    Exhausted,
}

impl fmt::Display for MoodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoodStatus::Awake => write!(f, "awake"),
            MoodStatus::Drowsy => write!(f, "drowsy"),
            MoodStatus::Sleeping => write!(f, "sleeping"),
            MoodStatus::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Current mood of a character.
///
/// Missing fields deserialize to the neutral baseline (energy 80, awake).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodState {
    /// Mood label, e.g. "Focused".
    pub current: String,
    /// One-line description for prompt injection.
    pub description: String,
    /// Energy level, 0–100.
    pub energy_level: u8,
    /// Physiological status.
    pub status: MoodStatus,
    /// When this state was last committed.
    pub last_update: DateTime<Utc>,
}

impl MoodState {
    /// Neutral baseline mood with the given energy.
    #[must_use]
    pub fn baseline(energy_level: u8) -> Self {
        Self {
            current: "Calm".to_string(),
            description: "Settled and attentive.".to_string(),
            energy_level: energy_level.min(100),
            status: MoodStatus::Awake,
            last_update: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl Default for MoodState {
    fn default() -> Self {
        Self::baseline(80)
    }
}

/// Outcome of a tick or override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoodTick {
    /// Nothing worth reporting changed; keep the previous state.
    Unchanged,
    /// A new state to store and broadcast.
    Changed(MoodState),
}

impl MoodTick {
    /// Whether this tick produced a new state.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        matches!(self, MoodTick::Changed(_))
    }
}

/// One circadian band: local hours `[start_hour, end_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircadianBand {
    /// First local hour covered (inclusive).
    pub start_hour: u32,
    /// Local hour where the next band starts (exclusive).
    pub end_hour: u32,
    /// Mood label.
    pub label: &'static str,
    /// Short description.
    pub description: &'static str,
    /// Physiological status during this band.
    pub status: MoodStatus,
    /// Energy level the clock drifts toward.
    pub energy_target: u8,
}

/// The daily cycle. Bands are disjoint and together cover hours 0–23.
pub const CIRCADIAN_BANDS: [CircadianBand; 8] = [
    CircadianBand { start_hour: 0, end_hour: 6, label: "Asleep", description: "Fast asleep, somewhere in a dream.", status: MoodStatus::Sleeping, energy_target: 30 },
    CircadianBand { start_hour: 6, end_hour: 9, label: "Groggy", description: "Just woke up, still rubbing sleepy eyes.", status: MoodStatus::Awake, energy_target: 70 },
    CircadianBand { start_hour: 9, end_hour: 12, label: "Focused", description: "Sharp and busy with the morning.", status: MoodStatus::Awake, energy_target: 90 },
    CircadianBand { start_hour: 12, end_hour: 14, label: "Content", description: "Had lunch and feels pleasantly full.", status: MoodStatus::Awake, energy_target: 75 },
    CircadianBand { start_hour: 14, end_hour: 17, label: "Drowsy", description: "Fighting the afternoon slump.", status: MoodStatus::Drowsy, energy_target: 55 },
    CircadianBand { start_hour: 17, end_hour: 20, label: "Lively", description: "Done with the day and in high spirits.", status: MoodStatus::Awake, energy_target: 85 },
    CircadianBand { start_hour: 20, end_hour: 23, label: "Relaxed", description: "Winding down for the evening.", status: MoodStatus::Awake, energy_target: 60 },
    CircadianBand { start_hour: 23, end_hour: 24, label: "Sleepy", description: "Yawning and thinking about bed.", status: MoodStatus::Drowsy, energy_target: 25 },
];

/// The band covering a local hour (0–23). Out-of-range hours wrap.
#[must_use]
pub fn band_for_hour(hour: u32) -> &'static CircadianBand {
    let hour = hour % 24;
    CIRCADIAN_BANDS
        .iter()
        .find(|band| hour >= band.start_hour && hour < band.end_hour)
        .unwrap_or(&CIRCADIAN_BANDS[0])
}

/// An explicit mood change requested from outside the clock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoodOverride {
    /// Replacement label, if any.
    pub label: Option<String>,
    /// Replacement description, if any.
    pub description: Option<String>,
    /// Signed energy adjustment.
    pub energy_delta: i16,
    /// Replacement status, if any.
    pub status: Option<MoodStatus>,
}

impl MoodOverride {
    /// The mood bump caused by receiving a gift.
    #[must_use]
    pub fn gift(gift_name: &str) -> Self {
        Self {
            label: Some("Delighted".to_string()),
            description: Some(format!("Still smiling about the {gift_name} they received.")),
            energy_delta: 15,
            status: None,
        }
    }
}

/// Circadian mood clock.
#[derive(Debug, Clone)]
pub struct MoodClock {
    max_energy_step: u8,
    energy_tolerance: u8,
    exhausted_threshold: u8,
}

impl Default for MoodClock {
    fn default() -> Self {
        Self::new(&MoodConfig::default())
    }
}

impl MoodClock {
    /// Create a clock from configuration.
    #[must_use]
    pub fn new(config: &MoodConfig) -> Self {
        Self {
            max_energy_step: config.max_energy_step,
            energy_tolerance: config.energy_tolerance,
            exhausted_threshold: config.exhausted_threshold,
        }
    }

    /// Advance the mood for wall-clock time `now` in the character's time zone.
    #[must_use]
    pub fn tick(&self, mood: &MoodState, timezone: Tz, now: DateTime<Utc>) -> MoodTick {
        let local_hour = now.with_timezone(&timezone).hour();
        let band = band_for_hour(local_hour);
        let energy = nudge(mood.energy_level, band.energy_target, self.max_energy_step);

        let mut candidate = MoodState {
            current: band.label.to_string(),
            description: band.description.to_string(),
            energy_level: energy,
            status: band.status,
            last_update: now,
        };

        if band.status != MoodStatus::Sleeping && energy <= self.exhausted_threshold {
            candidate.current = "Worn out".to_string();
            candidate.description = "Running on empty and struggling to keep up.".to_string();
            candidate.status = MoodStatus::Exhausted;
        }

        self.commit(mood, candidate)
    }

    /// Apply an external override through the same commit rule as a tick.
    #[must_use]
    pub fn apply_override(
        &self,
        mood: &MoodState,
        change: &MoodOverride,
        now: DateTime<Utc>,
    ) -> MoodTick {
        let energy = (i16::from(mood.energy_level) + change.energy_delta).clamp(0, 100);
        let candidate = MoodState {
            current: change.label.clone().unwrap_or_else(|| mood.current.clone()),
            description: change
                .description
                .clone()
                .unwrap_or_else(|| mood.description.clone()),
            energy_level: u8::try_from(energy).unwrap_or(mood.energy_level),
            status: change.status.unwrap_or(mood.status),
            last_update: now,
        };
        self.commit(mood, candidate)
    }

    /// Decide whether `candidate` differs enough from `previous` to report.
    #[must_use]
    pub fn commit(&self, previous: &MoodState, candidate: MoodState) -> MoodTick {
        let energy_moved =
            previous.energy_level.abs_diff(candidate.energy_level) >= self.energy_tolerance;
        let relabelled = previous.current != candidate.current;
        let status_changed = previous.status != candidate.status;

        if !(energy_moved || relabelled || status_changed) {
            return MoodTick::Unchanged;
        }

        debug!(
            from = %previous.current,
            to = %candidate.current,
            energy_from = previous.energy_level,
            energy_to = candidate.energy_level,
            status = %candidate.status,
            "Mood committed"
        );
        MoodTick::Changed(candidate)
    }
}

/// Move `current` toward `target` by at most `max_step`.
fn nudge(current: u8, target: u8, max_step: u8) -> u8 {
    if current < target {
        current.saturating_add(max_step.min(target - current))
    } else {
        current.saturating_sub(max_step.min(current - target))
    }
}
