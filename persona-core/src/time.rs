//! Symbolic-to-absolute time resolution for scheduled messages.
//!
//! The model asks for follow-ups with coarse tokens ("afternoon",
//! "tomorrow_morning") rather than timestamps. Resolution happens in the
//! character's local time; the fallback chain never fails.

use chrono::{DateTime, Days, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use std::str::FromStr;
use tracing::debug;

use crate::config::{MAX_FALLBACK_HOURS, ScheduleConfig};

/// Past this local hour "afternoon" means tomorrow; the hour itself still counts as today.
const AFTERNOON_CUTOFF_HOUR: u32 = 18;

/// A recognised symbolic time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeToken {
    /// Today 15:00, or tomorrow 15:00 when asked after 18:00:00.
    Afternoon,
    /// Today 21:00. Also accepts "evening".
    Tonight,
    /// Tomorrow 09:00.
    TomorrowMorning,
    /// Tomorrow 15:00.
    TomorrowAfternoon,
}

/// Returned by [`TimeToken::from_str`] for anything outside the closed token set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownToken(pub String);

impl std::fmt::Display for UnknownToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown time token '{}'", self.0)
    }
}

impl std::error::Error for UnknownToken {}

impl FromStr for TimeToken {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c.to_ascii_lowercase() })
            .collect();
        match normalized.as_str() {
            "afternoon" => Ok(Self::Afternoon),
            "tonight" | "evening" => Ok(Self::Tonight),
            "tomorrow_morning" => Ok(Self::TomorrowMorning),
            "tomorrow_afternoon" => Ok(Self::TomorrowAfternoon),
            _ => Err(UnknownToken(s.to_string())),
        }
    }
}

/// Turns a token and/or free text into an absolute local timestamp.
#[derive(Debug, Clone)]
pub struct RelativeTimeResolver {
    fallback: Duration,
}

impl Default for RelativeTimeResolver {
    fn default() -> Self {
        Self::new(&ScheduleConfig::default())
    }
}

impl RelativeTimeResolver {
    /// Create a resolver from configuration.
    ///
    /// The fallback delay is clamped to `0..=MAX_FALLBACK_HOURS`.
    #[must_use]
    pub fn new(config: &ScheduleConfig) -> Self {
        Self {
            fallback: Duration::hours(config.fallback_hours.clamp(0, MAX_FALLBACK_HOURS)),
        }
    }

    /// Resolve `token` (preferred) or `original_text` relative to `now`.
    ///
    /// Fallback chain: recognised token, then "tomorrow" anywhere in the text
    /// (tomorrow 12:00), then `now` plus the fallback delay.
    #[must_use]
    pub fn resolve(
        &self,
        token: Option<&str>,
        original_text: Option<&str>,
        now: DateTime<Tz>,
    ) -> DateTime<Tz> {
        let tz = now.timezone();
        let today = now.date_naive();
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);

        let cutoff = NaiveTime::from_hms_opt(AFTERNOON_CUTOFF_HOUR, 0, 0).unwrap_or_default();

        let parsed = token.and_then(|t| t.parse::<TimeToken>().ok());
        let resolved = match parsed {
            Some(TimeToken::Afternoon) if now.time() > cutoff => {
                at_local(tomorrow, 15, tz)
            }
            Some(TimeToken::Afternoon) => at_local(today, 15, tz),
            Some(TimeToken::Tonight) => at_local(today, 21, tz),
            Some(TimeToken::TomorrowMorning) => at_local(tomorrow, 9, tz),
            Some(TimeToken::TomorrowAfternoon) => at_local(tomorrow, 15, tz),
            None if original_text.is_some_and(mentions_tomorrow) => at_local(tomorrow, 12, tz),
            None => now.checked_add_signed(self.fallback).unwrap_or(now),
        };
        debug!(token = ?token, resolved = %resolved, "Resolved relative time");
        resolved
    }
}

fn mentions_tomorrow(text: &str) -> bool {
    text.to_lowercase().contains("tomorrow")
}

/// `date` at `hour:00` local time in `tz`.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times inside a
/// DST gap move forward one hour.
#[must_use]
pub fn at_local(date: NaiveDate, hour: u32, tz: Tz) -> DateTime<Tz> {
    let time = NaiveTime::from_hms_opt(hour % 24, 0, 0).unwrap_or_default();
    local_datetime(date, time, tz)
}

/// `date` at `time` in `tz`, total over DST transitions.
#[must_use]
pub fn local_datetime(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Tz> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t,
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .unwrap_or_else(|| tz.from_utc_datetime(&naive))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(tz: Tz, y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
        tz.with_ymd_and_hms(y, mo, d, h, mi, 0).single().expect("valid local time")
    }

    fn resolve(token: Option<&str>, text: Option<&str>, now: DateTime<Tz>) -> DateTime<Tz> {
        RelativeTimeResolver::default().resolve(token, text, now)
    }

    #[test]
    fn afternoon_rolls_over_after_six_pm() {
        let now = local(Tz::UTC, 2024, 6, 1, 18, 30);
        assert_eq!(resolve(Some("afternoon"), None, now), local(Tz::UTC, 2024, 6, 2, 15, 0));

        let morning = local(Tz::UTC, 2024, 6, 1, 10, 0);
        assert_eq!(resolve(Some("afternoon"), None, morning), local(Tz::UTC, 2024, 6, 1, 15, 0));
    }

    #[test]
    fn six_pm_sharp_is_still_today() {
        let tz = Tz::UTC;
        let sharp = local(tz, 2024, 6, 1, 18, 0);
        assert_eq!(resolve(Some("afternoon"), None, sharp), local(tz, 2024, 6, 1, 15, 0));

        let one_second_later = tz.with_ymd_and_hms(2024, 6, 1, 18, 0, 1).single().expect("valid");
        assert_eq!(
            resolve(Some("afternoon"), None, one_second_later),
            local(tz, 2024, 6, 2, 15, 0)
        );
    }

    #[test]
    fn oversized_fallback_is_clamped_to_a_week() {
        let resolver = RelativeTimeResolver::new(&ScheduleConfig {
            fallback_hours: i64::MAX / 1000,
            ..ScheduleConfig::default()
        });
        let now = local(Tz::UTC, 2024, 6, 1, 10, 0);
        assert_eq!(
            resolver.resolve(None, Some("later"), now),
            now + Duration::hours(MAX_FALLBACK_HOURS)
        );

        let negative = RelativeTimeResolver::new(&ScheduleConfig {
            fallback_hours: -5,
            ..ScheduleConfig::default()
        });
        assert_eq!(negative.resolve(None, None, now), now);
    }

    #[test]
    fn fixed_tokens() {
        let now = local(Tz::Europe__Berlin, 2024, 6, 1, 10, 0);
        let tz = Tz::Europe__Berlin;
        assert_eq!(resolve(Some("tonight"), None, now), local(tz, 2024, 6, 1, 21, 0));
        assert_eq!(resolve(Some("Evening"), None, now), local(tz, 2024, 6, 1, 21, 0));
        assert_eq!(resolve(Some("tomorrow_morning"), None, now), local(tz, 2024, 6, 2, 9, 0));
        assert_eq!(resolve(Some("tomorrow afternoon"), None, now), local(tz, 2024, 6, 2, 15, 0));
    }

    #[test]
    fn tomorrow_in_text_means_noon() {
        let now = local(Tz::UTC, 2024, 6, 1, 22, 0);
        assert_eq!(
            resolve(None, Some("see you tomorrow"), now),
            local(Tz::UTC, 2024, 6, 2, 12, 0)
        );
        assert_eq!(
            resolve(Some("someday"), Some("TOMORROW then"), now),
            local(Tz::UTC, 2024, 6, 2, 12, 0)
        );
    }

    #[test]
    fn nothing_recognised_falls_back_three_hours() {
        let now = local(Tz::UTC, 2024, 6, 1, 22, 15);
        assert_eq!(resolve(None, None, now), now + Duration::minutes(180));
        assert_eq!(resolve(Some("whenever"), Some("later"), now), now + Duration::minutes(180));
    }

    #[test]
    fn tomorrow_crosses_month_end() {
        let now = local(Tz::UTC, 2024, 2, 29, 8, 0);
        assert_eq!(
            resolve(Some("tomorrow_morning"), None, now),
            local(Tz::UTC, 2024, 3, 1, 9, 0)
        );
    }

    #[test]
    fn dst_gap_moves_forward() {
        // 2024-03-10 02:30 does not exist in New York.
        let tz = Tz::America__New_York;
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).expect("date");
        let time = NaiveTime::from_hms_opt(2, 30, 0).expect("time");
        assert_eq!(local_datetime(date, time, tz), local(tz, 2024, 3, 10, 3, 30));
    }

    #[test]
    fn token_parsing_is_case_insensitive() {
        assert_eq!("AFTERNOON".parse::<TimeToken>(), Ok(TimeToken::Afternoon));
        assert_eq!("Tomorrow-Morning".parse::<TimeToken>(), Ok(TimeToken::TomorrowMorning));
        assert!("noon".parse::<TimeToken>().is_err());
    }
}
