//! Conversation gap analysis: who let the conversation go quiet, and for how long.
//!
//! History is scanned newest-first over a bounded number of adjacent message
//! pairs. The first pair separated by more than the silence threshold is the
//! nearest *silence break*; older breaks are not reported. A break is a
//! natural ending when the closing exchange before it contains a farewell.
//! Otherwise the party who spoke last before the silence determines the blame.
//!
//! System messages are not conversational turns and are skipped.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::config::GapConfig;
use crate::types::{Message, Party};

/// Instruction for a user who was left without a reply.
pub const IGNORED_BY_ASSISTANT: &str = "You left the user's last message unanswered for a long \
    time. Acknowledge the delay and apologise briefly before continuing.";

/// Instruction for a user who comes back after going quiet.
pub const USER_RETURNED_LATE: &str = "The user went quiet for a while after your last message \
    and has just come back. Welcome them back and gently mention that you missed them.";

/// Instruction for a conversation restarted after a natural ending.
pub const STALE_CONVERSATION_RESTART: &str = "The last conversation ended naturally some time \
    ago. Greet the user as if starting a new conversation; do not pick up the old topic unprompted.";

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Why the conversation went silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreakKind {
    /// Someone said goodbye; nobody is at fault.
    NaturalEnding,
    /// The user spoke last and got no reply.
    AssistantIgnoredUser,
    /// The assistant spoke last and the user stopped answering.
    UserWentQuiet,
}

impl BreakKind {
    /// Party held responsible for the silence.
    #[must_use]
    pub fn blame(self) -> Option<Party> {
        match self {
            Self::NaturalEnding => None,
            Self::AssistantIgnoredUser => Some(Party::Assistant),
            Self::UserWentQuiet => Some(Party::User),
        }
    }

    /// Prompt instruction for this kind of break.
    #[must_use]
    pub fn instruction(self) -> &'static str {
        match self {
            Self::NaturalEnding => STALE_CONVERSATION_RESTART,
            Self::AssistantIgnoredUser => IGNORED_BY_ASSISTANT,
            Self::UserWentQuiet => USER_RETURNED_LATE,
        }
    }
}

/// Coarse size of a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GapGranularity {
    /// Under five minutes.
    JustNow,
    /// Under an hour.
    Minutes,
    /// Under a day.
    Hours,
    /// A day or more.
    Days,
}

/// Human-readable description of a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapDescription {
    /// Bucket.
    pub granularity: GapGranularity,
    /// Gap length in units of `granularity` (0 for [`GapGranularity::JustNow`]).
    pub amount: i64,
    /// Whether both ends of the gap fall on the same local calendar date.
    pub same_day: bool,
}

impl GapDescription {
    /// Describe a gap of `minutes` whose endpoints are `from` and `to`, in `tz`.
    #[must_use]
    pub fn new(minutes: i64, from: DateTime<Utc>, to: DateTime<Utc>, tz: Tz) -> Self {
        let minutes = minutes.max(0);
        let (granularity, amount) = match minutes {
            m if m < 5 => (GapGranularity::JustNow, 0),
            m if m < 60 => (GapGranularity::Minutes, m),
            m if m < 24 * 60 => (GapGranularity::Hours, m / 60),
            m => (GapGranularity::Days, m / (24 * 60)),
        };
        let same_day = from.with_timezone(&tz).date_naive() == to.with_timezone(&tz).date_naive();
        Self {
            granularity,
            amount,
            same_day,
        }
    }
}

impl fmt::Display for GapDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.granularity {
            GapGranularity::JustNow => return f.write_str("just now"),
            GapGranularity::Minutes => "minute",
            GapGranularity::Hours => "hour",
            GapGranularity::Days => "day",
        };
        let plural = if self.amount == 1 { "" } else { "s" };
        let day = if self.same_day { "earlier today" } else { "on an earlier day" };
        write!(f, "{} {unit}{plural} ago, {day}", self.amount)
    }
}

/// Output of [`GapAnalyzer::analyze`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapAnalysis {
    /// Length of the reported gap in minutes.
    ///
    /// The silence break if one was found, otherwise the time since the last
    /// conversational message.
    pub gap_minutes: i64,
    /// Bucketed description of `gap_minutes`.
    pub description: GapDescription,
    /// Who is responsible for the silence, if anyone.
    pub blame: Option<Party>,
    /// Kind of silence break, if one was found or synthesized.
    pub kind: Option<BreakKind>,
    /// Prompt instruction for the break, if any.
    pub instruction: Option<&'static str>,
}

impl GapAnalysis {
    fn quiet(gap_minutes: i64, description: GapDescription) -> Self {
        Self {
            gap_minutes,
            description,
            blame: None,
            kind: None,
            instruction: None,
        }
    }

    fn with_break(gap_minutes: i64, description: GapDescription, kind: BreakKind) -> Self {
        Self {
            gap_minutes,
            description,
            blame: kind.blame(),
            kind: Some(kind),
            instruction: Some(kind.instruction()),
        }
    }
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// Scans history for the nearest silence break.
#[derive(Debug, Clone)]
pub struct GapAnalyzer {
    threshold_minutes: i64,
    scan_pairs: usize,
    closure_lookback: usize,
    closure_keywords: Vec<String>,
}

impl Default for GapAnalyzer {
    fn default() -> Self {
        Self::new(&GapConfig::default())
    }
}

impl GapAnalyzer {
    /// Create an analyzer from configuration.
    #[must_use]
    pub fn new(config: &GapConfig) -> Self {
        Self {
            threshold_minutes: config.silence_threshold_minutes,
            scan_pairs: config.scan_pairs,
            closure_lookback: config.closure_lookback.max(1),
            closure_keywords: config
                .closure_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Analyze `history` (chronological) as of `now`.
    #[must_use]
    pub fn analyze(&self, history: &[Message], now: DateTime<Tz>) -> GapAnalysis {
        let tz = now.timezone();
        let now_utc = now.with_timezone(&Utc);
        let turns: Vec<&Message> = history.iter().filter(|m| m.party().is_some()).collect();

        let Some(last) = turns.last() else {
            return GapAnalysis::quiet(0, GapDescription::new(0, now_utc, now_utc, tz));
        };

        for later in (1..turns.len()).rev().take(self.scan_pairs) {
            let earlier = later - 1;
            let elapsed = turns[later].timestamp - turns[earlier].timestamp;
            if !self.exceeds_threshold(elapsed) {
                continue;
            }
            let minutes = elapsed.num_minutes();

            let kind = if self.closes_conversation(&turns, earlier) {
                BreakKind::NaturalEnding
            } else if turns[earlier].party() == Some(Party::User) {
                BreakKind::AssistantIgnoredUser
            } else {
                BreakKind::UserWentQuiet
            };
            debug!(gap_minutes = minutes, kind = ?kind, "Silence break found");
            let description =
                GapDescription::new(minutes, turns[earlier].timestamp, turns[later].timestamp, tz);
            return GapAnalysis::with_break(minutes, description, kind);
        }

        let elapsed = now_utc - last.timestamp;
        let since_last = elapsed.num_minutes().max(0);
        let description = GapDescription::new(since_last, last.timestamp, now_utc, tz);
        if last.party() == Some(Party::User) && self.exceeds_threshold(elapsed) {
            debug!(gap_minutes = since_last, "Unanswered user message");
            return GapAnalysis::with_break(
                since_last,
                description,
                BreakKind::AssistantIgnoredUser,
            );
        }
        GapAnalysis::quiet(since_last, description)
    }

    /// Whether `elapsed` is strictly longer than the silence threshold, to the second.
    fn exceeds_threshold(&self, elapsed: Duration) -> bool {
        elapsed.num_seconds() > self.threshold_minutes.saturating_mul(60)
    }

    /// Whether the exchange ending at `turns[earlier]` contains a farewell.
    fn closes_conversation(&self, turns: &[&Message], earlier: usize) -> bool {
        let start = (earlier + 1).saturating_sub(self.closure_lookback);
        turns[start..=earlier].iter().any(|m| {
            let content = m.content.to_lowercase();
            self.closure_keywords.iter().any(|k| content.contains(k.as_str()))
        })
    }
}
