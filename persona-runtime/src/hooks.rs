//! Entry points the host application calls when something happens to a
//! character outside the normal turn flow.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use persona_core::display::{DisplayResolver, DisplayState};
use persona_core::mood::{MoodClock, MoodOverride, MoodState};
use persona_core::relationship::{RelationshipClassifier, RelationshipStatus};
use persona_core::schedule::ScheduledMessage;
use persona_core::{EmotionVector, Message};
use tracing::{debug, info};

use crate::error::Result;
use crate::state::SharedCharacter;

/// The user gave the character a gift.
///
/// Returns the new mood if the bump was large enough to commit.
pub fn on_gift(
    character: &SharedCharacter,
    clock: &MoodClock,
    gift_name: &str,
    now: DateTime<Utc>,
) -> Option<MoodState> {
    info!(gift = gift_name, "Gift received");
    character.override_mood(clock, &MoodOverride::gift(gift_name), now)
}

/// The conversation pipeline produced new relationship scores and emotions.
pub fn on_scores_changed(
    character: &SharedCharacter,
    classifier: &RelationshipClassifier,
    romance: i32,
    friendship: i32,
    emotions: EmotionVector,
) -> RelationshipStatus {
    character.update(|c| {
        c.emotions = emotions;
        c.apply_scores(romance, friendship, classifier)
    })
}

/// A user message arrived.
///
/// # Errors
/// Returns an error if `now` is older than the newest recorded message.
pub fn on_user_message(character: &SharedCharacter, text: &str, now: DateTime<Utc>) -> Result<()> {
    character.update(|c| c.push_message(Message::user(text, now)))?;
    debug!(chars = text.chars().count(), "User message recorded");
    Ok(())
}

/// Remove and return the follow-ups due at `now`.
pub fn on_schedule_check(character: &SharedCharacter, now: DateTime<Utc>) -> Vec<ScheduledMessage> {
    let due = character.update(|c| c.schedule.take_due(now));
    if !due.is_empty() {
        info!(count = due.len(), "Scheduled messages due");
    }
    due
}

/// The badge to show right now.
#[must_use]
pub fn current_badge(
    character: &SharedCharacter,
    resolver: &DisplayResolver,
    now: DateTime<Utc>,
    tz: Tz,
) -> DisplayState {
    character.read(|c| c.badge(resolver, now, tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use persona_core::Character;
    use persona_core::display::DisplayKind;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).single().expect("valid")
    }

    #[test]
    fn scores_update_emotions_and_status() {
        let shared = SharedCharacter::new(Character::new("Mina", ""));
        let classifier = RelationshipClassifier::standard();
        let status = on_scores_changed(
            &shared,
            &classifier,
            -80,
            0,
            EmotionVector::new(0, 90, 0, 0, 0).with_friendship(-40),
        );
        assert_eq!(status, RelationshipStatus::Hostile);
        let snap = shared.snapshot();
        assert_eq!(snap.emotions.anger, 90);
        assert_eq!(snap.relationship.status(), RelationshipStatus::Hostile);
    }

    #[test]
    fn user_messages_must_be_chronological() {
        let shared = SharedCharacter::new(Character::new("Mina", ""));
        on_user_message(&shared, "hi", at(10)).expect("first");
        assert!(on_user_message(&shared, "earlier", at(9)).is_err());
        assert_eq!(shared.snapshot().history().len(), 1);
    }

    #[test]
    fn schedule_check_drains_due_only() {
        let shared = SharedCharacter::new(Character::new("Mina", ""));
        shared.update(|c| {
            c.schedule.push(ScheduledMessage::new(at(9), "early", None), 10);
            c.schedule.push(ScheduledMessage::new(at(12), "late", None), 10);
        });
        let due = on_schedule_check(&shared, at(10));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].reason, "early");
        assert_eq!(shared.snapshot().schedule.len(), 1);
        assert!(on_schedule_check(&shared, at(10) + Duration::minutes(1)).is_empty());
    }

    #[test]
    fn gift_changes_badge() {
        let shared = SharedCharacter::new(Character::new("Mina", ""));
        let clock = MoodClock::default();
        let resolver = DisplayResolver::standard();
        on_gift(&shared, &clock, "cake", at(3)).expect("committed");
        // Energy 95 at noon UTC with no strong emotions.
        assert_eq!(
            current_badge(&shared, &resolver, at(12), Tz::UTC).kind,
            DisplayKind::Energetic
        );
    }
}
