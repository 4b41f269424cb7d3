//! Background task that ticks the mood clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use persona_core::PersonaConfig;
use persona_core::mood::{MoodClock, MoodState};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::state::SharedCharacter;

type ClockSource = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Counters updated by a running driver.
#[derive(Debug, Default)]
pub struct DriverStats {
    ticks: AtomicU64,
    changes: AtomicU64,
}

impl DriverStats {
    /// Ticks evaluated so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Ticks that committed a new mood.
    #[must_use]
    pub fn changes(&self) -> u64 {
        self.changes.load(Ordering::Relaxed)
    }
}

/// Drives [`MoodClock`] for one character at a fixed period.
pub struct MoodClockDriver {
    character: SharedCharacter,
    clock: MoodClock,
    tz: Tz,
    period: Duration,
    now: ClockSource,
    stats: Arc<DriverStats>,
}

impl MoodClockDriver {
    /// Build a driver from configuration. Reads the wall clock by default.
    ///
    /// # Errors
    /// Returns an error if the configured time zone is unknown.
    pub fn new(character: SharedCharacter, config: &PersonaConfig) -> Result<Self> {
        Ok(Self {
            character,
            clock: MoodClock::new(&config.mood),
            tz: config.general.timezone()?,
            period: Duration::from_secs(config.mood.tick_interval_secs.max(1)),
            now: Arc::new(Utc::now),
            stats: Arc::new(DriverStats::default()),
        })
    }

    /// Replace the wall clock, e.g. with a fixed instant in tests.
    #[must_use]
    pub fn with_clock_source(
        mut self,
        now: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        self.now = Arc::new(now);
        self
    }

    /// Counters shared with the running task.
    #[must_use]
    pub fn stats(&self) -> Arc<DriverStats> {
        Arc::clone(&self.stats)
    }

    /// Evaluate one tick immediately.
    pub fn tick_once(&self) -> Option<MoodState> {
        self.stats.ticks.fetch_add(1, Ordering::Relaxed);
        let committed = self.character.tick_mood(&self.clock, self.tz, (self.now)());
        if let Some(mood) = &committed {
            self.stats.changes.fetch_add(1, Ordering::Relaxed);
            debug!(mood = %mood.current, energy = mood.energy_level, "Mood tick committed");
        }
        committed
    }

    /// Run on the current tokio runtime until [`DriverHandle::stop`].
    ///
    /// The first tick fires immediately; missed ticks are skipped.
    #[must_use]
    pub fn spawn(self) -> DriverHandle {
        let shutdown = Arc::new(Notify::new());
        let stats = self.stats();
        let signal = Arc::clone(&shutdown);
        info!(period_secs = self.period.as_secs(), tz = %self.tz, "Mood clock driver started");

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick_once();
                    }
                    () = signal.notified() => break,
                }
            }
            info!(
                ticks = self.stats.ticks(),
                changes = self.stats.changes(),
                "Mood clock driver stopped"
            );
        });

        DriverHandle {
            shutdown,
            task,
            stats,
        }
    }
}

/// Handle to a spawned [`MoodClockDriver`].
#[derive(Debug)]
pub struct DriverHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
    stats: Arc<DriverStats>,
}

impl DriverHandle {
    /// Counters of the running driver.
    #[must_use]
    pub fn stats(&self) -> Arc<DriverStats> {
        Arc::clone(&self.stats)
    }

    /// Stop the driver and wait for its task to finish.
    pub async fn stop(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Mood clock driver task failed");
        }
    }
}
