//! Tool declarations offered to the model.

use serde::Deserialize;
use serde_json::json;

use crate::error::LlmError;
use crate::types::{ToolDeclaration, ToolInvocation};

/// Name of the follow-up scheduling tool.
pub const SCHEDULE_MESSAGE: &str = "schedule_message";

/// Symbolic times the model may pass as `time_token`.
pub const TIME_TOKENS: [&str; 5] = [
    "afternoon",
    "tonight",
    "evening",
    "tomorrow_morning",
    "tomorrow_afternoon",
];

/// Declaration of [`SCHEDULE_MESSAGE`].
#[must_use]
pub fn schedule_message_tool() -> ToolDeclaration {
    ToolDeclaration {
        name: SCHEDULE_MESSAGE.to_string(),
        description: "Promise to message the user later on your own. Use when you say you \
                      will get back to them, check in, or say goodnight later."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "time_token": {
                    "type": "string",
                    "enum": TIME_TOKENS,
                    "description": "When to send the message, if it is one of these."
                },
                "reason": {
                    "type": "string",
                    "description": "What you want to talk about then."
                },
                "reply": {
                    "type": "string",
                    "description": "What you say right now, before the follow-up."
                }
            },
            "required": ["reason"]
        }),
    }
}

/// Arguments of a [`SCHEDULE_MESSAGE`] call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduleMessageArgs {
    /// Symbolic time; resolved by the state engine, may be anything.
    #[serde(default)]
    pub time_token: Option<String>,
    /// What to talk about.
    pub reason: String,
    /// Immediate reply to show alongside scheduling.
    #[serde(default)]
    pub reply: Option<String>,
}

impl ScheduleMessageArgs {
    /// Parse the arguments of `call`.
    ///
    /// # Errors
    /// Returns [`LlmError::InvalidToolCall`] for another tool or malformed arguments.
    pub fn parse(call: &ToolInvocation) -> Result<Self, LlmError> {
        if call.name != SCHEDULE_MESSAGE {
            return Err(LlmError::InvalidToolCall {
                tool: call.name.clone(),
                reason: "unknown tool".to_string(),
            });
        }
        let args: Self =
            serde_json::from_value(call.arguments.clone()).map_err(|e| LlmError::InvalidToolCall {
                tool: call.name.clone(),
                reason: e.to_string(),
            })?;
        if args.reason.trim().is_empty() {
            return Err(LlmError::InvalidToolCall {
                tool: call.name.clone(),
                reason: "empty reason".to_string(),
            });
        }
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(arguments: serde_json::Value) -> ToolInvocation {
        ToolInvocation {
            name: SCHEDULE_MESSAGE.to_string(),
            arguments,
        }
    }

    #[test]
    fn parses_full_arguments() {
        let args = ScheduleMessageArgs::parse(&call(json!({
            "time_token": "tonight",
            "reason": "ask about the exam",
            "reply": "Good luck!"
        })))
        .expect("valid");
        assert_eq!(args.time_token.as_deref(), Some("tonight"));
        assert_eq!(args.reply.as_deref(), Some("Good luck!"));
    }

    #[test]
    fn token_is_optional() {
        let args = ScheduleMessageArgs::parse(&call(json!({"reason": "check in"}))).expect("valid");
        assert_eq!(args.time_token, None);
    }

    #[test]
    fn rejects_other_tools_and_bad_arguments() {
        let other = ToolInvocation {
            name: "play_music".to_string(),
            arguments: json!({}),
        };
        assert!(ScheduleMessageArgs::parse(&other).is_err());
        assert!(ScheduleMessageArgs::parse(&call(json!({"time_token": "tonight"}))).is_err());
        assert!(ScheduleMessageArgs::parse(&call(json!({"reason": "  "}))).is_err());
    }

    #[test]
    fn declaration_lists_tokens() {
        let tool = schedule_message_tool();
        assert_eq!(tool.parameters["properties"]["time_token"]["enum"][3], "tomorrow_morning");
    }
}
