//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::TriggerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Secret used only when the operator explicitly opts in. Anyone who has read
/// this source knows it.
pub const INSECURE_DEFAULT_TOKEN: &str = "insecure-default-token-change-me";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of loading: the validated config and whether the built-in secret
/// had to be used.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: TriggerConfig,
    pub insecure_default_token: bool,
}

/// Load, apply `PORT`/`TOKEN` from the process environment, and validate.
pub fn load_config(path: Option<&Path>, allow_insecure_default: bool) -> Result<LoadedConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => TriggerConfig::default(),
    };
    config.auth.allow_insecure_default |= allow_insecure_default;

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    finalize(config)
}

/// Parse a TOML document into a config without validating it.
pub fn parse_config(content: &str) -> Result<TriggerConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply environment overrides. `lookup` abstracts `std::env::var` for tests.
pub fn apply_env_overrides<F>(config: &mut TriggerConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        config.listener.port = port.trim().parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::Env {
                var: "PORT",
                reason: e.to_string(),
            }
        })?;
    }

    if let Some(token) = lookup("TOKEN") {
        config.auth.token = Some(token);
    }

    Ok(())
}

/// Resolve the insecure fallback secret and run semantic validation.
pub fn finalize(mut config: TriggerConfig) -> Result<LoadedConfig, ConfigError> {
    let mut insecure_default_token = false;
    if config.auth.token.is_none() && config.auth.allow_insecure_default {
        config.auth.token = Some(INSECURE_DEFAULT_TOKEN.to_string());
        insecure_default_token = true;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(LoadedConfig {
        config,
        insecure_default_token,
    })
}
