//! Construct an [`LlmClient`] from [`LlmConfig`].

use persona_core::config::LlmConfig;
use persona_llm::{GenerationParams, LlmClient, LlmProvider};
use tracing::info;

use crate::error::{Result, RuntimeError};

/// Resolve the configured provider.
///
/// The API key is read from the environment variable named by
/// `config.api_key_env`; it is only required for the `openai` provider.
///
/// # Errors
/// Returns [`RuntimeError::Config`] for an unknown provider or a missing key.
pub fn provider_from_config(config: &LlmConfig) -> Result<LlmProvider> {
    provider_with_key(config, std::env::var(&config.api_key_env).ok())
}

fn provider_with_key(config: &LlmConfig, api_key: Option<String>) -> Result<LlmProvider> {
    match config.provider.to_lowercase().as_str() {
        "openai" => {
            let api_key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                RuntimeError::Config(format!(
                    "provider 'openai' needs an API key in ${}",
                    config.api_key_env
                ))
            })?;
            Ok(LlmProvider::OpenAiCompatible {
                base_url: config.base_url.clone(),
                api_key,
            })
        }
        "ollama" => Ok(LlmProvider::Ollama {
            base_url: config.base_url.clone(),
        }),
        "none" => Ok(LlmProvider::None),
        other => Err(RuntimeError::Config(format!("unknown llm provider '{other}'"))),
    }
}

/// Sampling parameters for companion replies.
#[must_use]
pub fn reply_params(config: &LlmConfig) -> GenerationParams {
    GenerationParams {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    }
}

/// Sampling parameters for summarisation; cooler than replies.
#[must_use]
pub fn summary_params(config: &LlmConfig) -> GenerationParams {
    GenerationParams {
        model: config.summary_model.clone(),
        max_tokens: config.max_tokens,
        temperature: 0.3,
    }
}

/// Build a client for `character_name` from configuration.
///
/// # Errors
/// See [`provider_from_config`].
pub fn client_from_config(config: &LlmConfig, character_name: &str) -> Result<LlmClient> {
    let provider = provider_from_config(config)?;
    info!(
        provider = %config.provider,
        model = %config.model,
        timeout_ms = config.request_timeout_ms,
        "LLM client configured"
    );
    Ok(
        LlmClient::new(provider, config.request_timeout_ms, summary_params(config))
            .with_character_name(character_name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            base_url: "http://localhost:11434".to_string(),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn openai_requires_key() {
        let err = provider_with_key(&config("openai"), None).expect_err("no key");
        assert!(matches!(err, RuntimeError::Config(msg) if msg.contains("OPENAI_API_KEY")));

        let err = provider_with_key(&config("openai"), Some("  ".into())).expect_err("blank key");
        assert!(matches!(err, RuntimeError::Config(_)));

        let provider = provider_with_key(&config("OpenAI"), Some("sk-test".into())).expect("key");
        assert!(matches!(provider, LlmProvider::OpenAiCompatible { api_key, .. } if api_key == "sk-test"));
    }

    #[test]
    fn ollama_and_none_need_no_key() {
        assert_eq!(
            provider_with_key(&config("ollama"), None).expect("ollama"),
            LlmProvider::Ollama {
                base_url: "http://localhost:11434".to_string()
            }
        );
        assert_eq!(provider_with_key(&config("none"), None).expect("none"), LlmProvider::None);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!(provider_with_key(&config("carrier-pigeon"), None).is_err());
    }

    #[test]
    fn params_follow_config() {
        let cfg = LlmConfig::default();
        assert_eq!(reply_params(&cfg).max_tokens, 512);
        assert_eq!(summary_params(&cfg).model, cfg.summary_model);
        assert!(summary_params(&cfg).temperature < reply_params(&cfg).temperature);
    }
}
