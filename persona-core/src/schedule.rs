//! Pending follow-up messages the character promised to send.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// A message the character will send on its own at `due_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMessage {
    /// Identifier.
    pub id: Uuid,
    /// When the message becomes due.
    pub due_at: DateTime<Utc>,
    /// What the character wants to talk about.
    pub reason: String,
    /// Symbolic time the model asked for, if any.
    #[serde(default)]
    pub token: Option<String>,
}

impl ScheduledMessage {
    /// Create a scheduled message.
    #[must_use]
    pub fn new(due_at: DateTime<Utc>, reason: impl Into<String>, token: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            due_at,
            reason: reason.into(),
            token,
        }
    }
}

/// Pending messages, kept sorted by due time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pending: Vec<ScheduledMessage>,
}

impl Schedule {
    /// Add `message`, keeping at most `max_pending` entries.
    ///
    /// When full, the entry due last is dropped (which may be `message` itself).
    pub fn push(&mut self, message: ScheduledMessage, max_pending: usize) {
        let index = self
            .pending
            .partition_point(|m| m.due_at <= message.due_at);
        debug!(due_at = %message.due_at, reason = %message.reason, "Scheduled message");
        self.pending.insert(index, message);
        while self.pending.len() > max_pending {
            if let Some(dropped) = self.pending.pop() {
                warn!(due_at = %dropped.due_at, "Schedule full, dropping latest entry");
            }
        }
    }

    /// Remove and return every message due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<ScheduledMessage> {
        let split = self.pending.partition_point(|m| m.due_at <= now);
        self.pending.drain(..split).collect()
    }

    /// When the next message is due.
    #[must_use]
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.pending.first().map(|m| m.due_at)
    }

    /// Pending messages, earliest first.
    #[must_use]
    pub fn pending(&self) -> &[ScheduledMessage] {
        &self.pending
    }

    /// Number of pending messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).single().expect("valid")
    }

    #[test]
    fn take_due_returns_in_order_and_removes() {
        let mut schedule = Schedule::default();
        schedule.push(ScheduledMessage::new(at(15), "afternoon check-in", None), 10);
        schedule.push(ScheduledMessage::new(at(9), "good morning", None), 10);
        schedule.push(ScheduledMessage::new(at(21), "goodnight", None), 10);

        let due = schedule.take_due(at(15));
        let reasons: Vec<_> = due.iter().map(|m| m.reason.as_str()).collect();
        assert_eq!(reasons, ["good morning", "afternoon check-in"]);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.next_due(), Some(at(21)));
    }

    #[test]
    fn full_schedule_drops_latest() {
        let mut schedule = Schedule::default();
        for h in [10, 12, 14] {
            schedule.push(ScheduledMessage::new(at(h), format!("at {h}"), None), 2);
        }
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.pending()[1].due_at, at(12));

        schedule.push(ScheduledMessage::new(at(11), "earlier", None), 2);
        assert_eq!(schedule.pending()[1].reason, "earlier");
    }

    #[test]
    fn nothing_due_yet() {
        let mut schedule = Schedule::default();
        schedule.push(ScheduledMessage::new(at(12), "lunch", None), 5);
        assert!(schedule.take_due(at(12) - Duration::seconds(1)).is_empty());
        assert!(!schedule.is_empty());
    }
}
