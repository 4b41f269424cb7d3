//! Prompt templates.
//!
//! Templates use `{key}` placeholders filled by [`render_template`]. The
//! built-in set can be overridden per deployment from a directory of TOML
//! files (see [`PromptEngine::from_directory`]).

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::error::LlmError;
use crate::types::{ChatMessage, ChatRole};

/// Companion reply: system-level template wrapped around the state block.
pub const COMPANION_SYSTEM: &str = r"{state_block}

RULES:
- You are {character_name}. Stay in character and never mention being an AI.
- Let your mood, energy and relationship colour your tone; never recite them.
- Keep replies short and conversational, like a text message.
- If you promise to message the user later, call the schedule_message tool instead of replying.";

/// History summarisation, system part.
pub const SUMMARY_SYSTEM: &str = r"You keep the long-term memory of a conversation between {character_name} and the user.
Write a compact third-person summary that keeps names, promises, feelings and facts the user shared.
Drop small talk. Never invent details.";

/// History summarisation, user part.
pub const SUMMARY_USER: &str = r"Previous summary:
{prior_summary}

New messages:
{transcript}

Return the updated summary as plain text, under {max_words} words.";

/// Replace every `{key}` in `template` with its value.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

/// Render messages as `role: content` lines.
#[must_use]
pub fn format_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                ChatRole::System => "note",
                ChatRole::User => "user",
                ChatRole::Assistant => "character",
            };
            format!("{role}: {}", m.content.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// PromptEngine
// ---------------------------------------------------------------------------

/// Identifies a prompt template by purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Companion reply.
    Companion,
    /// History summarisation.
    Summary,
}

impl PromptId {
    /// TOML filename for this prompt.
    #[must_use]
    pub fn filename(self) -> &'static str {
        match self {
            Self::Companion => "companion.toml",
            Self::Summary => "summary.toml",
        }
    }

    /// All prompt IDs.
    #[must_use]
    pub fn all() -> &'static [PromptId] {
        &[Self::Companion, Self::Summary]
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Companion => write!(f, "companion"),
            Self::Summary => write!(f, "summary"),
        }
    }
}

impl FromStr for PromptId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "companion" => Ok(Self::Companion),
            "summary" => Ok(Self::Summary),
            _ => Err(format!("unknown prompt id: '{s}'")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TomlPromptFile {
    prompt: PromptTemplate,
}

/// A ready-to-render prompt.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PromptTemplate {
    /// Version string.
    pub version: String,
    /// System template.
    pub system: String,
    /// User template; empty when the prompt only has a system part.
    #[serde(default)]
    pub user: String,
}

/// Built-in templates with optional on-disk overrides.
#[derive(Debug, Clone)]
pub struct PromptEngine {
    templates: HashMap<PromptId, PromptTemplate>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptEngine {
    /// The compiled-in templates.
    #[must_use]
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        templates.insert(
            PromptId::Companion,
            PromptTemplate {
                version: "builtin".into(),
                system: COMPANION_SYSTEM.into(),
                user: String::new(),
            },
        );
        templates.insert(
            PromptId::Summary,
            PromptTemplate {
                version: "builtin".into(),
                system: SUMMARY_SYSTEM.into(),
                user: SUMMARY_USER.into(),
            },
        );
        Self { templates }
    }

    /// Built-ins, overridden by any `<prompt>.toml` found in `dir`.
    ///
    /// # Errors
    /// Returns [`LlmError::ConfigError`] if a file exists but cannot be read or parsed.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self, LlmError> {
        let dir = dir.as_ref();
        let mut engine = Self::builtin();

        for id in PromptId::all() {
            let path = dir.join(id.filename());
            if !path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&path)
                .map_err(|e| LlmError::ConfigError(format!("failed to read {}: {e}", path.display())))?;
            let parsed: TomlPromptFile = toml::from_str(&content)
                .map_err(|e| LlmError::ConfigError(format!("failed to parse {}: {e}", path.display())))?;
            debug!(prompt = %id, version = %parsed.prompt.version, "Loaded prompt override");
            engine.templates.insert(*id, parsed.prompt);
        }

        Ok(engine)
    }

    /// The template for `id`.
    #[must_use]
    pub fn get(&self, id: PromptId) -> Option<&PromptTemplate> {
        self.templates.get(&id)
    }

    /// Render the companion system prompt around `state_block`.
    #[must_use]
    pub fn companion_system(&self, character_name: &str, state_block: &str) -> String {
        let template = self
            .get(PromptId::Companion)
            .map_or(COMPANION_SYSTEM, |t| t.system.as_str());
        render_template(
            template,
            &[("character_name", character_name), ("state_block", state_block)],
        )
    }

    /// Render the summary prompt as `(system, user)`.
    #[must_use]
    pub fn summary(
        &self,
        character_name: &str,
        prior_summary: Option<&str>,
        messages: &[ChatMessage],
        max_words: u32,
    ) -> (String, String) {
        let (system, user) = self
            .get(PromptId::Summary)
            .map_or((SUMMARY_SYSTEM, SUMMARY_USER), |t| (t.system.as_str(), t.user.as_str()));
        let transcript = format_transcript(messages);
        let max_words = max_words.to_string();
        let vars = [
            ("character_name", character_name),
            ("prior_summary", prior_summary.unwrap_or("(none yet)")),
            ("transcript", transcript.as_str()),
            ("max_words", max_words.as_str()),
        ];
        (render_template(system, &vars), render_template(user, &vars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_every_occurrence() {
        let out = render_template("{a} and {a} but not {b}", &[("a", "x")]);
        assert_eq!(out, "x and x but not {b}");
    }

    #[test]
    fn transcript_labels_roles() {
        let t = format_transcript(&[ChatMessage::user(" hi "), ChatMessage::assistant("hey")]);
        assert_eq!(t, "user: hi\ncharacter: hey");
    }

    #[test]
    fn directory_override_replaces_builtin() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("companion.toml"),
            "[prompt]\nversion = \"2\"\nsystem = \"{state_block}\\nBe {character_name}.\"\n",
        )
        .expect("write");

        let engine = PromptEngine::from_directory(dir.path()).expect("load");
        assert_eq!(engine.get(PromptId::Companion).expect("companion").version, "2");
        assert_eq!(engine.companion_system("Mina", "STATE"), "STATE\nBe Mina.");
        assert_eq!(engine.get(PromptId::Summary).expect("summary").version, "builtin");
    }

    #[test]
    fn broken_override_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("summary.toml"), "not toml [").expect("write");
        assert!(matches!(
            PromptEngine::from_directory(dir.path()),
            Err(LlmError::ConfigError(_))
        ));
    }
}
