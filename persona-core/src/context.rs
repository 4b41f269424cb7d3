//! Turn context assembly.
//!
//! Collects everything the state engine knows about the current turn (lore,
//! silence analysis, mood, relationship) and renders it into the system-level
//! block of the outbound prompt.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt::Write as _;
use tracing::debug;

use crate::character::Character;
use crate::config::WorldBookConfig;
use crate::gap::{GapAnalysis, GapAnalyzer};
use crate::mood::{MoodState, MoodStatus};
use crate::relationship::RelationshipState;
use crate::world_book::{self, KnowledgeBase};

/// Context derived for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnContext {
    /// Persona description.
    pub persona: String,
    /// Rolling summary of older history.
    pub summary: Option<String>,
    /// Retrieved lore, one entry per line, bounded in length.
    pub lore: String,
    /// Silence analysis.
    pub gap: GapAnalysis,
    /// Mood and energy line.
    pub mood_line: String,
    /// Behavioural instruction derived from energy, if any.
    pub energy_instruction: Option<&'static str>,
    /// Relationship line.
    pub relationship_line: String,
}

impl TurnContext {
    /// Derive the context for answering `user_text` at `now`.
    #[must_use]
    pub fn assemble(
        character: &Character,
        knowledge_bases: &[KnowledgeBase],
        user_text: &str,
        analyzer: &GapAnalyzer,
        world_book: &WorldBookConfig,
        now: DateTime<Tz>,
    ) -> Self {
        let entries = world_book::retrieve(user_text, knowledge_bases, &character.enabled_world_books);
        let lore = join_bounded(entries.iter().map(|e| e.content.as_str()), world_book.max_lore_chars);
        let gap = analyzer.analyze(character.history(), now);

        debug!(
            character = %character.id,
            lore_chars = lore.chars().count(),
            blame = ?gap.blame,
            "Turn context assembled"
        );

        Self {
            persona: character.persona.clone(),
            summary: character.summary().map(str::to_string),
            lore,
            gap,
            mood_line: mood_line(&character.mood),
            energy_instruction: energy_instruction(&character.mood),
            relationship_line: relationship_line(&character.relationship),
        }
    }

    /// Render the system-level prompt block.
    #[must_use]
    pub fn system_block(&self) -> String {
        let mut block = self.persona.trim().to_string();

        if let Some(summary) = &self.summary {
            let _ = write!(block, "\n\n[Earlier conversation]\n{summary}");
        }
        if !self.lore.is_empty() {
            let _ = write!(block, "\n\n[World info]\n{}", self.lore);
        }

        let _ = write!(block, "\n\n[Current state]\n{}\n{}", self.mood_line, self.relationship_line);
        if let Some(instruction) = self.energy_instruction {
            let _ = write!(block, "\n{instruction}");
        }

        if self.gap.gap_minutes > 0 || self.gap.instruction.is_some() {
            let _ = write!(block, "\n\n[Timing]\nLast activity: {}.", self.gap.description);
            if let Some(instruction) = self.gap.instruction {
                let _ = write!(block, "\n{instruction}");
            }
        }

        block.trim_start().to_string()
    }
}

/// Join `parts` with newlines, keeping whole parts while the total fits `max_chars`.
fn join_bounded<'a>(parts: impl Iterator<Item = &'a str>, max_chars: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for part in parts {
        let len = part.chars().count() + usize::from(!out.is_empty());
        if used + len > max_chars {
            debug!(max_chars, "Lore budget exhausted, skipping remaining entries");
            break;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(part);
        used += len;
    }
    out
}

fn mood_line(mood: &MoodState) -> String {
    format!(
        "Mood: {} ({}). Energy {}/100, {}.",
        mood.current, mood.description, mood.energy_level, mood.status
    )
}

fn energy_instruction(mood: &MoodState) -> Option<&'static str> {
    match mood.status {
        MoodStatus::Sleeping => Some(
            "You were asleep and the message woke you. Sound sleepy and keep it brief.",
        ),
        MoodStatus::Exhausted => Some("You are exhausted. Answer in a few tired words."),
        _ if mood.energy_level < 30 => Some("You are low on energy. Keep replies short."),
        _ if mood.energy_level > 80 => Some("You are full of energy. Be lively and playful."),
        _ => None,
    }
}

fn relationship_line(relationship: &RelationshipState) -> String {
    format!(
        "Relationship with the user: {} (romance {}, friendship {}).",
        relationship.status(),
        relationship.romance,
        relationship.friendship
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use crate::world_book::WorldBookEntry;
    use chrono::{Duration, TimeZone, Utc};

    fn now() -> DateTime<Tz> {
        Tz::UTC.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).single().expect("valid")
    }

    fn setup() -> (Character, Vec<KnowledgeBase>) {
        let kb = KnowledgeBase::new("Town")
            .with_entry(WorldBookEntry::constant("Mina works at the Moonbean cafe."))
            .with_entry(WorldBookEntry::keyword(["cat"], "Mina's cat is called Biscuit.").expect("keys"));
        let mut character = Character::new("Mina", "You are Mina, a cheerful barista.");
        character.enabled_world_books.push(kb.id);
        (character, vec![kb])
    }

    #[test]
    fn block_contains_lore_and_state() {
        let (character, kbs) = setup();
        let ctx = TurnContext::assemble(
            &character,
            &kbs,
            "how is your cat?",
            &GapAnalyzer::default(),
            &WorldBookConfig::default(),
            now(),
        );
        let block = ctx.system_block();
        assert!(block.starts_with("You are Mina"));
        assert!(block.contains("Biscuit"));
        assert!(block.contains("Moonbean"));
        assert!(block.contains("Relationship with the user: Acquaintance"));
    }

    #[test]
    fn lore_is_bounded_by_whole_entries() {
        let (character, kbs) = setup();
        let ctx = TurnContext::assemble(
            &character,
            &kbs,
            "cat",
            &GapAnalyzer::default(),
            &WorldBookConfig { max_lore_chars: 40 },
            now(),
        );
        assert_eq!(ctx.lore, "Mina works at the Moonbean cafe.");
    }

    #[test]
    fn ignored_user_instruction_is_spliced_in() {
        let (mut character, kbs) = setup();
        let sent = now().with_timezone(&Utc) - Duration::hours(5);
        character.push_message(Message::user("are you there?", sent)).expect("push");
        let ctx = TurnContext::assemble(
            &character,
            &kbs,
            "hello?",
            &GapAnalyzer::default(),
            &WorldBookConfig::default(),
            now(),
        );
        let block = ctx.system_block();
        assert!(block.contains(crate::gap::IGNORED_BY_ASSISTANT));
        assert!(block.contains("5 hours ago"));
    }

    #[test]
    fn sleeping_character_gets_sleepy_instruction() {
        let (mut character, kbs) = setup();
        character.mood.status = MoodStatus::Sleeping;
        let ctx = TurnContext::assemble(
            &character,
            &kbs,
            "",
            &GapAnalyzer::default(),
            &WorldBookConfig::default(),
            now(),
        );
        assert!(ctx.energy_instruction.is_some_and(|i| i.contains("asleep")));
    }
}
