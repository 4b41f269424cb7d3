//! Tracing subscriber setup.

use persona_core::config::GeneralConfig;
use tracing_subscriber::EnvFilter;

use crate::error::{Result, RuntimeError};

/// The filter used for `config`: `RUST_LOG` if set, else `general.log_level`.
///
/// # Errors
/// Returns [`RuntimeError::Config`] if the configured level does not parse.
pub fn env_filter(config: &GeneralConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            RuntimeError::Config(format!("invalid log level '{}': {e}", config.log_level))
        }),
    }
}

/// Install the global subscriber.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
///
/// # Errors
/// Returns [`RuntimeError::Config`] if the configured level does not parse.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let installed = if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    };
    if installed {
        tracing::info!(level = %config.log_level, json = config.json_logs, "Tracing initialised");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_level_is_a_config_error() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = GeneralConfig {
            log_level: "persona=loud".to_string(),
            ..GeneralConfig::default()
        };
        assert!(matches!(env_filter(&config), Err(RuntimeError::Config(_))));
    }

    #[test]
    fn init_twice_is_harmless() {
        let config = GeneralConfig::default();
        init_tracing(&config).expect("first");
        init_tracing(&config).expect("second");
    }
}
