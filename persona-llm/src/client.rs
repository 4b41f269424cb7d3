//! LLM client for OpenAI-compatible and Ollama chat endpoints.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::prompt::PromptEngine;
use crate::types::{
    ChatMessage, GenerationParams, GenerationRequest, GenerationResponse, SummaryRequest,
    ToolDeclaration, ToolInvocation,
};
use crate::{ResponseGenerator, Summarizer};

/// Longest error body kept in [`LlmError::Http`].
const MAX_ERROR_BODY: usize = 300;

/// Backend the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmProvider {
    /// Ollama's `/api/chat`.
    Ollama {
        /// Server base URL.
        base_url: String,
    },
    /// Any `/v1/chat/completions` endpoint.
    OpenAiCompatible {
        /// Server base URL.
        base_url: String,
        /// Bearer token.
        api_key: String,
    },
    /// No backend; every call fails with [`LlmError::Unavailable`].
    None,
}

/// Routes requests to the configured backend.
#[derive(Debug, Clone)]
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    timeout_ms: u64,
    summary_params: GenerationParams,
    character_name: String,
    prompts: PromptEngine,
}

impl LlmClient {
    /// Create a client.
    ///
    /// `summary_params` is used for [`Summarizer`] calls; generation requests
    /// carry their own parameters.
    #[must_use]
    pub fn new(provider: LlmProvider, timeout_ms: u64, summary_params: GenerationParams) -> Self {
        Self {
            provider,
            http: Client::new(),
            timeout_ms,
            summary_params,
            character_name: "the character".to_string(),
            prompts: PromptEngine::builtin(),
        }
    }

    /// A client with no backend.
    #[must_use]
    pub fn none() -> Self {
        Self::new(
            LlmProvider::None,
            0,
            GenerationParams {
                model: String::new(),
                max_tokens: 0,
                temperature: 0.0,
            },
        )
    }

    /// Name used in the summary prompt.
    #[must_use]
    pub fn with_character_name(mut self, name: impl Into<String>) -> Self {
        self.character_name = name.into();
        self
    }

    /// Use a custom prompt set.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptEngine) -> Self {
        self.prompts = prompts;
        self
    }

    /// Whether a backend is configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    async fn dispatch(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let (url, body, api_key) = match &self.provider {
            LlmProvider::None => {
                return Err(LlmError::Unavailable("No LLM provider configured".into()));
            }
            LlmProvider::Ollama { base_url } => (
                format!("{}/api/chat", base_url.trim_end_matches('/')),
                ollama_body(request),
                None,
            ),
            LlmProvider::OpenAiCompatible { base_url, api_key } => (
                format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
                openai_body(request),
                Some(api_key.as_str()),
            ),
        };

        let start = Instant::now();
        let mut builder = self
            .http
            .post(&url)
            .json(&body)
            .timeout(Duration::from_millis(self.timeout_ms));
        if let Some(key) = api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(url = %url, timeout_ms = self.timeout_ms, "LLM request timed out");
                LlmError::Timeout(self.timeout_ms)
            } else {
                warn!(url = %url, error = %e, "LLM request failed");
                LlmError::from(e)
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body: String = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            warn!(status = status.as_u16(), body = %body, "LLM backend returned error");
            return Err(LlmError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = resp.json().await?;
        let parsed = match self.provider {
            LlmProvider::Ollama { .. } => parse_ollama_response(&json),
            _ => parse_openai_response(&json),
        }?;

        debug!(
            model = %request.params.model,
            latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            tool_call = matches!(parsed, GenerationResponse::ToolCall(_)),
            "LLM response received"
        );
        Ok(parsed)
    }
}

#[async_trait]
impl ResponseGenerator for LlmClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        self.dispatch(request).await
    }
}

#[async_trait]
impl Summarizer for LlmClient {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, LlmError> {
        let (system, user) = self.prompts.summary(
            &self.character_name,
            request.prior_summary.as_deref(),
            &request.messages,
            200,
        );
        let generation = GenerationRequest {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            params: self.summary_params.clone(),
            tools: Vec::new(),
        };
        match self.dispatch(&generation).await? {
            GenerationResponse::Text(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            GenerationResponse::Text(_) => Err(LlmError::ParseError("empty summary".into())),
            GenerationResponse::ToolCall(call) => Err(LlmError::ParseError(format!(
                "summariser answered with tool call '{}'",
                call.name
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire formats
// ---------------------------------------------------------------------------

fn tools_json(tools: &[ToolDeclaration]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                }
            })
        })
        .collect()
}

/// Body for `/v1/chat/completions`.
#[must_use]
pub fn openai_body(request: &GenerationRequest) -> Value {
    let mut body = json!({
        "model": request.params.model,
        "messages": request.messages,
        "max_tokens": request.params.max_tokens,
        "temperature": request.params.temperature,
    });
    if !request.tools.is_empty() {
        body["tools"] = Value::Array(tools_json(&request.tools));
    }
    body
}

/// Body for Ollama's `/api/chat`.
#[must_use]
pub fn ollama_body(request: &GenerationRequest) -> Value {
    let mut body = json!({
        "model": request.params.model,
        "messages": request.messages,
        "stream": false,
        "options": {
            "temperature": request.params.temperature,
            "num_predict": request.params.max_tokens,
        }
    });
    if !request.tools.is_empty() {
        body["tools"] = Value::Array(tools_json(&request.tools));
    }
    body
}

/// Interpret an OpenAI-style completion.
///
/// Tool-call arguments arrive as a JSON-encoded string.
///
/// # Errors
/// Returns [`LlmError::ParseError`] if neither text nor a tool call is present.
pub fn parse_openai_response(json: &Value) -> Result<GenerationResponse, LlmError> {
    let message = &json["choices"][0]["message"];
    if let Some(call) = message["tool_calls"].get(0) {
        let function = &call["function"];
        let name = function["name"]
            .as_str()
            .ok_or_else(|| LlmError::ParseError("tool call without name".into()))?;
        let arguments = match &function["arguments"] {
            Value::String(raw) => serde_json::from_str(raw)
                .map_err(|e| LlmError::ParseError(format!("tool arguments: {e}")))?,
            other => other.clone(),
        };
        return Ok(GenerationResponse::ToolCall(ToolInvocation {
            name: name.to_string(),
            arguments,
        }));
    }
    message["content"]
        .as_str()
        .map(|text| GenerationResponse::Text(text.to_string()))
        .ok_or_else(|| LlmError::ParseError(format!("unexpected response shape: {json}")))
}

/// Interpret an Ollama chat response.
///
/// # Errors
/// Returns [`LlmError::ParseError`] if neither text nor a tool call is present.
pub fn parse_ollama_response(json: &Value) -> Result<GenerationResponse, LlmError> {
    let message = &json["message"];
    if let Some(call) = message["tool_calls"].get(0) {
        let function = &call["function"];
        let name = function["name"]
            .as_str()
            .ok_or_else(|| LlmError::ParseError("tool call without name".into()))?;
        return Ok(GenerationResponse::ToolCall(ToolInvocation {
            name: name.to_string(),
            arguments: function["arguments"].clone(),
        }));
    }
    message["content"]
        .as_str()
        .map(|text| GenerationResponse::Text(text.to_string()))
        .ok_or_else(|| LlmError::ParseError(format!("unexpected response shape: {json}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schedule_message_tool;

    fn request(tools: Vec<ToolDeclaration>) -> GenerationRequest {
        GenerationRequest {
            messages: vec![ChatMessage::system("state"), ChatMessage::user("hi")],
            params: GenerationParams {
                model: "m".to_string(),
                max_tokens: 64,
                temperature: 0.5,
            },
            tools,
        }
    }

    #[test]
    fn openai_body_includes_tools_only_when_offered() {
        let body = openai_body(&request(Vec::new()));
        assert!(body.get("tools").is_none());
        assert_eq!(body["messages"][0]["role"], "system");

        let body = openai_body(&request(vec![schedule_message_tool()]));
        assert_eq!(body["tools"][0]["function"]["name"], "schedule_message");
    }

    #[test]
    fn ollama_body_disables_streaming() {
        let body = ollama_body(&request(Vec::new()));
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 64);
    }

    #[test]
    fn parses_openai_text_and_tool_call() {
        let text = json!({"choices": [{"message": {"role": "assistant", "content": "hey!"}}]});
        assert_eq!(
            parse_openai_response(&text).expect("text"),
            GenerationResponse::Text("hey!".into())
        );

        let call = json!({"choices": [{"message": {"content": null, "tool_calls": [{
            "id": "c1",
            "type": "function",
            "function": {"name": "schedule_message", "arguments": "{\"reason\":\"check in\"}"}
        }]}}]});
        match parse_openai_response(&call).expect("tool call") {
            GenerationResponse::ToolCall(inv) => {
                assert_eq!(inv.name, "schedule_message");
                assert_eq!(inv.arguments["reason"], "check in");
            }
            GenerationResponse::Text(t) => panic!("expected tool call, got {t}"),
        }
    }

    #[test]
    fn parses_ollama_tool_call_with_object_arguments() {
        let call = json!({"message": {"role": "assistant", "content": "", "tool_calls": [{
            "function": {"name": "schedule_message", "arguments": {"reason": "goodnight"}}
        }]}});
        match parse_ollama_response(&call).expect("tool call") {
            GenerationResponse::ToolCall(inv) => assert_eq!(inv.arguments["reason"], "goodnight"),
            GenerationResponse::Text(t) => panic!("expected tool call, got {t}"),
        }
    }

    #[test]
    fn malformed_response_is_parse_error() {
        assert!(matches!(
            parse_openai_response(&json!({"error": "nope"})),
            Err(LlmError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn no_provider_is_unavailable() {
        let client = LlmClient::none();
        assert!(!client.is_available());
        let err = client.generate(&request(Vec::new())).await.expect_err("no backend");
        assert!(matches!(err, LlmError::Unavailable(_)));
    }
}
