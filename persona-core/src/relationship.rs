//! Relationship Classifier: "What are we to each other?"
//!
//! Two signed axes (romance, friendship) are mapped to a relationship status
//! by an ordered rule table: rules are evaluated top-down and the first match
//! wins. Two rules are *transitions* that consult the previously returned
//! status:
//!
//! - `Friend` → `BuddingRomance` while romance sits in `[50, 60)`
//! - `Honeymoon`/`Stable` → `CoolingOff` while romance sits in `(30, 70)`
//!
//! They are placed before the steady-state buckets they interrupt. Without
//! that ordering the status flickers on small score deltas near a threshold.
//!
//! The classifier itself is pure; the hysteresis memory lives in
//! [`RelationshipState`], whose [`advance`](RelationshipState::advance) is the
//! only way to move it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::types::PersonalityTraits;

/// Relationship status shown on the character badge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipStatus {
    /// Open feud.
    Hostile,
    /// Recent falling-out.
    Conflict,
    /// Barely know each other.
    #[default]
    Acquaintance,
    /// Friends.
    Friend,
    /// Best friends.
    Bestie,
    /// One-sided infatuation with little friendship behind it.
    Crush,
    /// A friendship starting to turn romantic.
    BuddingRomance,
    /// Mixed signals.
    Ambiguous,
    /// New couple.
    Honeymoon,
    /// Long-term, settled couple.
    Stable,
    /// A couple drifting apart.
    CoolingOff,
}

impl RelationshipStatus {
    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Hostile => "Feud",
            Self::Conflict => "Conflict",
            Self::Acquaintance => "Acquaintance",
            Self::Friend => "Friend",
            Self::Bestie => "Best friend",
            Self::Crush => "Crush",
            Self::BuddingRomance => "Budding romance",
            Self::Ambiguous => "It's complicated",
            Self::Honeymoon => "Honeymoon",
            Self::Stable => "Steady partner",
            Self::CoolingOff => "Cooling off",
        }
    }

    /// Whether the pair is currently a couple.
    #[must_use]
    pub fn is_romantic(self) -> bool {
        matches!(self, Self::Honeymoon | Self::Stable | Self::CoolingOff)
    }
}

impl fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything a rule predicate may look at.
#[derive(Debug, Clone, Copy)]
pub struct RelationshipInput<'a> {
    /// Romance score.
    pub romance: i32,
    /// Friendship score.
    pub friendship: i32,
    /// Character personality.
    pub traits: &'a PersonalityTraits,
    /// Status returned by the previous classification.
    pub previous: RelationshipStatus,
}

/// Predicate deciding whether a rule fires.
pub type RulePredicate = fn(&RelationshipInput<'_>) -> bool;

/// One row of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct RelationshipRule {
    /// Stable rule name, used for insertion and tracing.
    pub name: &'static str,
    /// When the rule fires.
    pub predicate: RulePredicate,
    /// Status returned when it fires.
    pub status: RelationshipStatus,
}

impl RelationshipRule {
    /// Build a rule.
    #[must_use]
    pub const fn new(name: &'static str, predicate: RulePredicate, status: RelationshipStatus) -> Self {
        Self {
            name,
            predicate,
            status,
        }
    }
}

/// Ordered rule table; first match wins, otherwise [`RelationshipClassifier::fallback`].
#[derive(Debug, Clone)]
pub struct RelationshipClassifier {
    rules: Vec<RelationshipRule>,
    fallback: RelationshipStatus,
}

impl Default for RelationshipClassifier {
    fn default() -> Self {
        Self::standard()
    }
}

impl RelationshipClassifier {
    /// The standard table.
    #[must_use]
    pub fn standard() -> Self {
        use RelationshipStatus as S;

        let rules = vec![
            RelationshipRule::new("feud", |i| i.friendship < -20 || i.romance < -30, S::Hostile),
            RelationshipRule::new("conflict", |i| i.friendship < 0 || i.romance < -10, S::Conflict),
            RelationshipRule::new("acquaintance", |i| i.friendship < 30 && i.romance < 30, S::Acquaintance),
            RelationshipRule::new(
                "friend_to_romance",
                |i| i.previous == S::Friend && i.friendship >= 50 && (50..60).contains(&i.romance),
                S::BuddingRomance,
            ),
            RelationshipRule::new("bestie", |i| i.friendship >= 70 && i.romance < 50, S::Bestie),
            RelationshipRule::new("friend", |i| i.friendship >= 30 && i.romance < 40, S::Friend),
            RelationshipRule::new("crush", |i| i.friendship < 40 && i.romance >= 50, S::Crush),
            RelationshipRule::new(
                "couple_cooling",
                |i| matches!(i.previous, S::Honeymoon | S::Stable) && (31..70).contains(&i.romance),
                S::CoolingOff,
            ),
            RelationshipRule::new("stable", |i| i.friendship >= 90 && i.romance >= 90, S::Stable),
            RelationshipRule::new("honeymoon", |i| i.friendship >= 65 && i.romance >= 70, S::Honeymoon),
            RelationshipRule::new(
                "ambiguous",
                |i| i.friendship >= 60 && (40..60).contains(&i.romance),
                S::Ambiguous,
            ),
        ];

        Self {
            rules,
            fallback: S::Friend,
        }
    }

    /// The rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[RelationshipRule] {
        &self.rules
    }

    /// Status returned when no rule fires.
    #[must_use]
    pub fn fallback(&self) -> RelationshipStatus {
        self.fallback
    }

    /// Insert `rule` directly before the rule named `before`.
    ///
    /// Appends to the end of the table if no rule has that name.
    pub fn insert_before(&mut self, before: &str, rule: RelationshipRule) {
        let index = self
            .rules
            .iter()
            .position(|r| r.name == before)
            .unwrap_or(self.rules.len());
        self.rules.insert(index, rule);
    }

    /// Classify a score pair given the previously returned status.
    #[must_use]
    pub fn classify(
        &self,
        romance: i32,
        friendship: i32,
        traits: &PersonalityTraits,
        previous: RelationshipStatus,
    ) -> RelationshipStatus {
        let input = RelationshipInput {
            romance,
            friendship,
            traits,
            previous,
        };
        self.rules
            .iter()
            .find(|rule| (rule.predicate)(&input))
            .map_or(self.fallback, |rule| rule.status)
    }

    /// Name of the rule that would fire, or `None` for the fallback.
    #[must_use]
    pub fn matching_rule(
        &self,
        romance: i32,
        friendship: i32,
        traits: &PersonalityTraits,
        previous: RelationshipStatus,
    ) -> Option<&'static str> {
        let input = RelationshipInput {
            romance,
            friendship,
            traits,
            previous,
        };
        self.rules
            .iter()
            .find(|rule| (rule.predicate)(&input))
            .map(|rule| rule.name)
    }
}

/// Relationship scores plus the hysteresis memory.
///
/// `previous_status` is only ever written by [`RelationshipState::advance`],
/// so it always equals the classifier's last answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipState {
    /// Romance score.
    pub romance: i32,
    /// Friendship score.
    pub friendship: i32,
    previous_status: RelationshipStatus,
}

impl RelationshipState {
    /// Start a relationship from scratch; the first advance decides the status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The status returned by the last [`advance`](Self::advance).
    #[must_use]
    pub fn status(&self) -> RelationshipStatus {
        self.previous_status
    }

    /// Store new scores and run one transition of the state machine.
    pub fn advance(
        &mut self,
        romance: i32,
        friendship: i32,
        traits: &PersonalityTraits,
        classifier: &RelationshipClassifier,
    ) -> RelationshipStatus {
        let next = classifier.classify(romance, friendship, traits, self.previous_status);
        if next != self.previous_status {
            debug!(
                from = %self.previous_status,
                to = %next,
                romance,
                friendship,
                "Relationship transition"
            );
        }
        self.romance = romance;
        self.friendship = friendship;
        self.previous_status = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RelationshipStatus as S;

    fn classify(romance: i32, friendship: i32, previous: RelationshipStatus) -> RelationshipStatus {
        RelationshipClassifier::standard().classify(
            romance,
            friendship,
            &PersonalityTraits::default(),
            previous,
        )
    }

    #[test]
    fn negative_scores_are_hostile_or_conflict() {
        assert_eq!(classify(0, -21, S::Friend), S::Hostile);
        assert_eq!(classify(-31, 50, S::Friend), S::Hostile);
        assert_eq!(classify(0, -5, S::Friend), S::Conflict);
        assert_eq!(classify(-11, 50, S::Honeymoon), S::Conflict);
    }

    #[test]
    fn low_scores_are_acquaintance() {
        assert_eq!(classify(29, 29, S::Honeymoon), S::Acquaintance);
        assert_eq!(classify(0, 0, S::Acquaintance), S::Acquaintance);
    }

    #[test]
    fn cooling_off_boundary_at_seventy() {
        assert_eq!(classify(69, 65, S::Honeymoon), S::CoolingOff);
        assert_eq!(classify(70, 65, S::Honeymoon), S::Honeymoon);
    }

    #[test]
    fn hysteresis_depends_on_previous_status() {
        assert_eq!(classify(55, 55, S::Friend), S::BuddingRomance);
        assert_eq!(classify(55, 55, S::Acquaintance), S::Friend);
    }

    #[test]
    fn stricter_bucket_wins_inside_compound_steps() {
        assert_eq!(classify(20, 80, S::Friend), S::Bestie);
        assert_eq!(classify(20, 40, S::Friend), S::Friend);
        assert_eq!(classify(95, 95, S::Honeymoon), S::Stable);
        assert_eq!(classify(75, 70, S::Acquaintance), S::Honeymoon);
    }

    #[test]
    fn crush_and_ambiguous_buckets() {
        assert_eq!(classify(55, 35, S::Acquaintance), S::Crush);
        assert_eq!(classify(45, 60, S::Acquaintance), S::Ambiguous);
    }

    #[test]
    fn stable_couple_cools_off_when_romance_fades() {
        assert_eq!(classify(50, 95, S::Stable), S::CoolingOff);
    }

    #[test]
    fn state_machine_remembers_its_own_output() {
        let classifier = RelationshipClassifier::standard();
        let traits = PersonalityTraits::default();
        let mut state = RelationshipState::new();

        assert_eq!(state.advance(35, 55, &traits, &classifier), S::Friend);
        assert_eq!(state.status(), S::Friend);
        assert_eq!(state.advance(55, 55, &traits, &classifier), S::BuddingRomance);
        // Same scores again: previous is now BuddingRomance, so the transition
        // rule no longer applies and the cascade falls through to the default.
        assert_eq!(state.advance(55, 55, &traits, &classifier), S::Friend);
    }

    #[test]
    fn custom_rules_can_consult_traits() {
        let mut classifier = RelationshipClassifier::standard();
        classifier.insert_before(
            "crush",
            RelationshipRule::new(
                "guarded_heart",
                |i| i.traits.guardedness > 0.8 && i.romance >= 50 && i.friendship < 40,
                S::Ambiguous,
            ),
        );
        let guarded = PersonalityTraits {
            guardedness: 0.9,
            ..PersonalityTraits::default()
        };
        assert_eq!(classifier.classify(55, 35, &guarded, S::Acquaintance), S::Ambiguous);
        assert_eq!(
            classifier.classify(55, 35, &PersonalityTraits::default(), S::Acquaintance),
            S::Crush
        );
        assert_eq!(
            classifier.matching_rule(55, 35, &guarded, S::Acquaintance),
            Some("guarded_heart")
        );
    }

    #[test]
    fn fallback_is_friend() {
        // friendship 50, romance 45: no bucket matches.
        assert_eq!(classify(45, 50, S::Acquaintance), S::Friend);
        let classifier = RelationshipClassifier::standard();
        assert_eq!(
            classifier.matching_rule(45, 50, &PersonalityTraits::default(), S::Acquaintance),
            None
        );
    }
}
