//! Configuration for the persona engine.
//!
//! Maps directly to `persona.toml`. Every section and field is optional;
//! omitted values fall back to the defaults documented on each field.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{PersonaError, Result};

/// Longest fallback delay a schedule may use when no time is named (one week).
pub const MAX_FALLBACK_HOURS: i64 = 168;

/// Longest silence threshold accepted for gap analysis (thirty days).
pub const MAX_SILENCE_THRESHOLD_MINUTES: i64 = 43_200;

/// Top-level persona configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Circadian mood clock tuning.
    #[serde(default)]
    pub mood: MoodConfig,
    /// Conversation gap analysis.
    #[serde(default)]
    pub gap: GapConfig,
    /// Relative-time scheduling.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// World-book retrieval and injection.
    #[serde(default)]
    pub world_book: WorldBookConfig,
    /// Response-generation backend.
    #[serde(default)]
    pub llm: LlmConfig,
    /// History summarisation policy.
    #[serde(default)]
    pub summary: SummaryConfig,
    /// Persistence / save settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl PersonaConfig {
    /// Load configuration from a TOML string and validate it.
    ///
    /// # Errors
    /// Returns `PersonaError::Config` if the TOML is invalid or inconsistent.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| PersonaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    /// Returns `PersonaError::Config` describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        self.general.timezone()?;

        if self.mood.max_energy_step < self.mood.energy_tolerance {
            return Err(PersonaError::Config(format!(
                "mood.max_energy_step ({}) must be >= mood.energy_tolerance ({}), \
                 otherwise energy can never register a change",
                self.mood.max_energy_step, self.mood.energy_tolerance
            )));
        }
        if self.mood.default_energy > 100 {
            return Err(PersonaError::Config(format!(
                "mood.default_energy ({}) must be within 0..=100",
                self.mood.default_energy
            )));
        }
        if self.mood.tick_interval_secs == 0 {
            return Err(PersonaError::Config(
                "mood.tick_interval_secs must be positive".to_string(),
            ));
        }
        if !(1..=MAX_SILENCE_THRESHOLD_MINUTES).contains(&self.gap.silence_threshold_minutes) {
            return Err(PersonaError::Config(format!(
                "gap.silence_threshold_minutes ({}) must be within 1..={MAX_SILENCE_THRESHOLD_MINUTES}",
                self.gap.silence_threshold_minutes
            )));
        }
        if self.gap.scan_pairs == 0 {
            return Err(PersonaError::Config(
                "gap.scan_pairs must be positive".to_string(),
            ));
        }
        if !(0..=MAX_FALLBACK_HOURS).contains(&self.schedule.fallback_hours) {
            return Err(PersonaError::Config(format!(
                "schedule.fallback_hours ({}) must be within 0..={MAX_FALLBACK_HOURS}",
                self.schedule.fallback_hours
            )));
        }
        if self.summary.window > self.summary.trigger_len {
            return Err(PersonaError::Config(format!(
                "summary.window ({}) must not exceed summary.trigger_len ({})",
                self.summary.window, self.summary.trigger_len
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub json_logs: bool,
    /// IANA time zone the character lives in (e.g. `Asia/Tokyo`).
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl GeneralConfig {
    /// Parse the configured time zone.
    ///
    /// # Errors
    /// Returns `PersonaError::Config` for names unknown to the tz database.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| PersonaError::Config(format!("unknown timezone '{}': {e}", self.timezone)))
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            timezone: "UTC".to_string(),
        }
    }
}

/// Circadian mood clock tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodConfig {
    /// Seconds between clock ticks.
    #[serde(default = "default_60_u64")]
    pub tick_interval_secs: u64,
    /// Largest energy adjustment applied by a single tick.
    #[serde(default = "default_10_u8")]
    pub max_energy_step: u8,
    /// Energy deltas below this are not reported as a change.
    #[serde(default = "default_5_u8")]
    pub energy_tolerance: u8,
    /// Awake characters at or below this energy are reported as exhausted.
    #[serde(default = "default_10_u8")]
    pub exhausted_threshold: u8,
    /// Energy of a freshly created character.
    #[serde(default = "default_80_u8")]
    pub default_energy: u8,
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            max_energy_step: 10,
            energy_tolerance: 5,
            exhausted_threshold: 10,
            default_energy: 80,
        }
    }
}

/// Conversation gap analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapConfig {
    /// A silence longer than this many minutes is a break.
    #[serde(default = "default_120_i64")]
    pub silence_threshold_minutes: i64,
    /// How many adjacent message pairs to scan, newest first.
    #[serde(default = "default_15_usize")]
    pub scan_pairs: usize,
    /// How many messages before a break form the "closing exchange".
    #[serde(default = "default_2_usize")]
    pub closure_lookback: usize,
    /// Phrases that mark a conversation as ended on purpose.
    #[serde(default = "default_closure_keywords")]
    pub closure_keywords: Vec<String>,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            silence_threshold_minutes: 120,
            scan_pairs: 15,
            closure_lookback: 2,
            closure_keywords: default_closure_keywords(),
        }
    }
}

/// Relative-time scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Hours added to `now` when nothing in the request names a time.
    #[serde(default = "default_3_i64")]
    pub fallback_hours: i64,
    /// Upper bound on pending scheduled messages per character.
    #[serde(default = "default_20_usize")]
    pub max_pending: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            fallback_hours: 3,
            max_pending: 20,
        }
    }
}

/// World-book retrieval and injection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldBookConfig {
    /// Maximum characters of lore spliced into one prompt.
    #[serde(default = "default_4000_usize")]
    pub max_lore_chars: usize,
}

impl Default for WorldBookConfig {
    fn default() -> Self {
        Self {
            max_lore_chars: 4000,
        }
    }
}

/// Response-generation backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: "openai", "ollama", "none".
    #[serde(default = "default_openai")]
    pub provider: String,
    /// Base URL for the LLM API.
    #[serde(default = "default_openai_url")]
    pub base_url: String,
    /// Chat model name.
    #[serde(default = "default_chat_model")]
    pub model: String,
    /// Model used for history summarisation.
    #[serde(default = "default_chat_model")]
    pub summary_model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Hard timeout for any LLM call in milliseconds.
    #[serde(default = "default_30000")]
    pub request_timeout_ms: u64,
    /// Maximum tokens to generate per reply.
    #[serde(default = "default_512")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_0_8")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            summary_model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_timeout_ms: 30_000,
            max_tokens: 512,
            temperature: 0.8,
        }
    }
}

/// History summarisation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Summarise once this many messages are not yet covered by the summary.
    #[serde(default = "default_40_usize")]
    pub trigger_len: usize,
    /// Messages kept verbatim (not folded into the summary).
    #[serde(default = "default_20_usize")]
    pub window: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            trigger_len: 40,
            window: 20,
        }
    }
}

/// Persistence / save configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Detect save corruption via checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            wal_mode: true,
            checksum_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_timezone() -> String { "UTC".to_string() }
fn default_openai() -> String { "openai".to_string() }
fn default_openai_url() -> String { "https://api.openai.com".to_string() }
fn default_chat_model() -> String { "gpt-4o-mini".to_string() }
fn default_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_0_8() -> f32 { 0.8 }
fn default_5_u8() -> u8 { 5 }
fn default_10_u8() -> u8 { 10 }
fn default_80_u8() -> u8 { 80 }
fn default_2_usize() -> usize { 2 }
fn default_15_usize() -> usize { 15 }
fn default_20_usize() -> usize { 20 }
fn default_40_usize() -> usize { 40 }
fn default_4000_usize() -> usize { 4000 }
fn default_3_i64() -> i64 { 3 }
fn default_120_i64() -> i64 { 120 }
fn default_60_u64() -> u64 { 60 }
fn default_512() -> u32 { 512 }
fn default_30000() -> u64 { 30_000 }

fn default_closure_keywords() -> Vec<String> {
    [
        "goodnight",
        "good night",
        "night night",
        "bye",
        "gotta go",
        "got to go",
        "see you",
        "see ya",
        "talk later",
        "ttyl",
        "sleep well",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = PersonaConfig::from_toml("").expect("empty config is valid");
        assert_eq!(config.mood.tick_interval_secs, 60);
        assert_eq!(config.gap.silence_threshold_minutes, 120);
        assert_eq!(config.gap.scan_pairs, 15);
        assert!(config.gap.closure_keywords.iter().any(|k| k == "bye"));
        assert_eq!(config.general.timezone().expect("utc"), Tz::UTC);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = PersonaConfig::from_toml(
            r#"
            [general]
            timezone = "Asia/Tokyo"

            [mood]
            energy_tolerance = 3
            "#,
        )
        .expect("valid");
        assert_eq!(config.general.timezone().expect("tokyo"), Tz::Asia__Tokyo);
        assert_eq!(config.mood.energy_tolerance, 3);
        assert_eq!(config.mood.max_energy_step, 10);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let err = PersonaConfig::from_toml("[general]\ntimezone = \"Mars/Olympus\"")
            .expect_err("bogus zone");
        assert!(matches!(err, PersonaError::Config(_)));
    }

    #[test]
    fn step_smaller_than_tolerance_is_rejected() {
        let err = PersonaConfig::from_toml("[mood]\nmax_energy_step = 2\nenergy_tolerance = 5")
            .expect_err("step < tolerance");
        assert!(err.to_string().contains("max_energy_step"));
    }

    #[test]
    fn summary_window_must_fit_trigger() {
        let err = PersonaConfig::from_toml("[summary]\ntrigger_len = 10\nwindow = 30")
            .expect_err("window > trigger");
        assert!(err.to_string().contains("summary.window"));
    }

    #[test]
    fn out_of_range_durations_are_rejected() {
        let err = PersonaConfig::from_toml("[schedule]\nfallback_hours = 9000000000000000")
            .expect_err("fallback too large");
        assert!(err.to_string().contains("schedule.fallback_hours"));

        let err = PersonaConfig::from_toml("[schedule]\nfallback_hours = -1")
            .expect_err("negative fallback");
        assert!(err.to_string().contains("schedule.fallback_hours"));

        let err = PersonaConfig::from_toml("[gap]\nsilence_threshold_minutes = 0")
            .expect_err("zero threshold");
        assert!(err.to_string().contains("gap.silence_threshold_minutes"));

        let err = PersonaConfig::from_toml("[gap]\nsilence_threshold_minutes = 9223372036854775807")
            .expect_err("threshold too large");
        assert!(err.to_string().contains("gap.silence_threshold_minutes"));

        let config = PersonaConfig::from_toml("[schedule]\nfallback_hours = 168").expect("one week");
        assert_eq!(config.schedule.fallback_hours, MAX_FALLBACK_HOURS);
    }
}
