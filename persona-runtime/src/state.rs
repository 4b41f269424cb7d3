//! Shared, lock-guarded character state.
//!
//! Readers take cloned snapshots. Mood is written only through
//! [`SharedCharacter::tick_mood`] and [`SharedCharacter::override_mood`],
//! which both go through the clock's commit rule and notify subscribers only
//! on a committed change.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::RwLock;
use persona_core::Character;
use persona_core::mood::{MoodClock, MoodOverride, MoodState, MoodTick};
use tokio::sync::watch;
use tracing::trace;

#[derive(Debug)]
struct Inner {
    character: RwLock<Character>,
    mood_tx: watch::Sender<MoodState>,
}

/// A character shared between the clock driver, hooks and the turn pipeline.
#[derive(Debug, Clone)]
pub struct SharedCharacter {
    inner: Arc<Inner>,
}

impl SharedCharacter {
    /// Wrap `character`.
    #[must_use]
    pub fn new(character: Character) -> Self {
        let (mood_tx, _) = watch::channel(character.mood.clone());
        Self {
            inner: Arc::new(Inner {
                character: RwLock::new(character),
                mood_tx,
            }),
        }
    }

    /// A consistent copy of the whole character.
    #[must_use]
    pub fn snapshot(&self) -> Character {
        self.inner.character.read().clone()
    }

    /// Run `f` against the current state under a read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Character) -> R) -> R {
        f(&self.inner.character.read())
    }

    /// Receive every committed mood change.
    #[must_use]
    pub fn subscribe_mood(&self) -> watch::Receiver<MoodState> {
        self.inner.mood_tx.subscribe()
    }

    /// Advance the mood clock. Returns the new mood if it was committed.
    pub fn tick_mood(&self, clock: &MoodClock, tz: Tz, now: DateTime<Utc>) -> Option<MoodState> {
        self.commit_mood(|mood| clock.tick(mood, tz, now))
    }

    /// Apply an external mood override through the clock's commit rule.
    pub fn override_mood(
        &self,
        clock: &MoodClock,
        change: &MoodOverride,
        now: DateTime<Utc>,
    ) -> Option<MoodState> {
        self.commit_mood(|mood| clock.apply_override(mood, change, now))
    }

    fn commit_mood(&self, step: impl FnOnce(&MoodState) -> MoodTick) -> Option<MoodState> {
        let mut character = self.inner.character.write();
        match step(&character.mood) {
            MoodTick::Unchanged => {
                trace!(character = %character.id, "Mood unchanged");
                None
            }
            MoodTick::Changed(mood) => {
                character.mood = mood.clone();
                self.inner.mood_tx.send_replace(mood.clone());
                Some(mood)
            }
        }
    }

    /// Mutate everything except mood under the write lock.
    ///
    /// Any change `f` makes to `mood` is discarded.
    pub fn update<R>(&self, f: impl FnOnce(&mut Character) -> R) -> R {
        let mut character = self.inner.character.write();
        let mood = character.mood.clone();
        let out = f(&mut character);
        character.mood = mood;
        out
    }
}
