//! The turn pipeline: state in, prompt out, reply applied.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use persona_core::config::{ScheduleConfig, WorldBookConfig};
use persona_core::context::TurnContext;
use persona_core::gap::GapAnalyzer;
use persona_core::schedule::ScheduledMessage;
use persona_core::time::RelativeTimeResolver;
use persona_core::world_book::KnowledgeBase;
use persona_core::{Character, Message, PersonaConfig, Role};
use persona_llm::prompt::PromptEngine;
use persona_llm::tools::{ScheduleMessageArgs, schedule_message_tool};
use persona_llm::{ChatMessage, GenerationParams, GenerationRequest, GenerationResponse, ResponseGenerator};
use tracing::{debug, info};

use crate::backend::reply_params;
use crate::error::Result;
use crate::hooks::on_user_message;
use crate::state::SharedCharacter;

/// What a turn produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Text shown to the user now, if any.
    pub reply: Option<String>,
    /// Follow-up the character promised, if any.
    pub scheduled: Option<ScheduledMessage>,
}

/// Runs conversational turns against a [`ResponseGenerator`].
pub struct TurnEngine<G> {
    generator: G,
    prompts: PromptEngine,
    analyzer: GapAnalyzer,
    times: RelativeTimeResolver,
    world_book: WorldBookConfig,
    schedule: ScheduleConfig,
    params: GenerationParams,
    tz: Tz,
}

impl<G: ResponseGenerator> TurnEngine<G> {
    /// Build an engine from configuration.
    ///
    /// # Errors
    /// Returns an error if the configured time zone is unknown.
    pub fn new(generator: G, config: &PersonaConfig) -> Result<Self> {
        Ok(Self {
            generator,
            prompts: PromptEngine::builtin(),
            analyzer: GapAnalyzer::new(&config.gap),
            times: RelativeTimeResolver::new(&config.schedule),
            world_book: config.world_book.clone(),
            schedule: config.schedule.clone(),
            params: reply_params(&config.llm),
            tz: config.general.timezone()?,
        })
    }

    /// Use a custom prompt set.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptEngine) -> Self {
        self.prompts = prompts;
        self
    }

    /// The backend replies are generated with.
    #[must_use]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Derive the turn context for `user_text` at `now`.
    #[must_use]
    pub fn prepare_turn(
        &self,
        character: &Character,
        knowledge_bases: &[KnowledgeBase],
        user_text: &str,
        now: DateTime<Utc>,
    ) -> TurnContext {
        TurnContext::assemble(
            character,
            knowledge_bases,
            user_text,
            &self.analyzer,
            &self.world_book,
            now.with_timezone(&self.tz),
        )
    }

    /// The outbound request: system block, unsummarised history, tools.
    #[must_use]
    pub fn build_request(&self, character: &Character, context: &TurnContext) -> GenerationRequest {
        let system = self
            .prompts
            .companion_system(&character.name, &context.system_block());
        let mut messages = Vec::with_capacity(character.unsummarized().len() + 1);
        messages.push(ChatMessage::system(system));
        messages.extend(character.unsummarized().iter().map(to_chat));

        GenerationRequest {
            messages,
            params: self.params.clone(),
            tools: vec![schedule_message_tool()],
        }
    }

    /// Record `response` on the character.
    ///
    /// A text reply is appended to history. A scheduling call resolves its
    /// time against `user_text` and queues the follow-up, and its optional
    /// immediate reply is appended.
    ///
    /// # Errors
    /// Returns an error for an unknown tool or malformed tool arguments.
    pub fn apply_response(
        &self,
        character: &SharedCharacter,
        response: GenerationResponse,
        user_text: &str,
        now: DateTime<Utc>,
    ) -> Result<TurnOutcome> {
        match response {
            GenerationResponse::Text(text) => {
                let text = text.trim().to_string();
                character.update(|c| c.push_message(Message::assistant(text.as_str(), now)))?;
                Ok(TurnOutcome {
                    reply: Some(text),
                    scheduled: None,
                })
            }
            GenerationResponse::ToolCall(call) => {
                let args = ScheduleMessageArgs::parse(&call)?;
                let due_at = self
                    .times
                    .resolve(
                        args.time_token.as_deref(),
                        Some(user_text),
                        now.with_timezone(&self.tz),
                    )
                    .with_timezone(&Utc);
                let scheduled = ScheduledMessage::new(due_at, args.reason, args.time_token);
                let reply = args.reply.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
                let max_pending = self.schedule.max_pending;

                character.update(|c| -> persona_core::error::Result<()> {
                    c.schedule.push(scheduled.clone(), max_pending);
                    if let Some(reply) = &reply {
                        c.push_message(Message::assistant(reply.as_str(), now))?;
                    }
                    Ok(())
                })?;
                info!(due_at = %scheduled.due_at, reason = %scheduled.reason, "Follow-up scheduled");
                Ok(TurnOutcome {
                    reply,
                    scheduled: Some(scheduled),
                })
            }
        }
    }

    /// Record the user's message, generate a reply and apply it.
    ///
    /// No lock is held while waiting on the generator.
    ///
    /// # Errors
    /// Out-of-order messages, backend failures and malformed tool calls.
    pub async fn run_turn(
        &self,
        character: &SharedCharacter,
        knowledge_bases: &[KnowledgeBase],
        user_text: &str,
        now: DateTime<Utc>,
    ) -> Result<TurnOutcome> {
        on_user_message(character, user_text, now)?;
        let snapshot = character.snapshot();
        let context = self.prepare_turn(&snapshot, knowledge_bases, user_text, now);
        let request = self.build_request(&snapshot, &context);
        debug!(
            character = %snapshot.id,
            messages = request.messages.len(),
            blame = ?context.gap.blame,
            "Turn request sent"
        );
        let response = self.generator.generate(&request).await?;
        self.apply_response(character, response, user_text, now)
    }
}

pub(crate) fn to_chat(message: &Message) -> ChatMessage {
    match message.role {
        Role::User => ChatMessage::user(message.content.as_str()),
        Role::Assistant => ChatMessage::assistant(message.content.as_str()),
        Role::System => ChatMessage::system(message.content.as_str()),
    }
}
