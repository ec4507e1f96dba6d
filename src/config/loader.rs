//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{GateConfig, GateSettings, Secret};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable selecting `production` or `development`.
pub const ENV_ENVIRONMENT: &str = "GATE_ENV";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, resolve and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GateConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GateConfig = toml::from_str(&content)?;
    finalize(config)
}

/// Resolve environment overrides and validate.
///
/// Used for both file-based and built-in configurations.
pub fn finalize(config: GateConfig) -> Result<GateConfig, ConfigError> {
    finalize_with(config, |name| std::env::var(name).ok())
}

/// Same as [`finalize`] with an explicit variable lookup.
pub fn finalize_with<F>(mut config: GateConfig, lookup: F) -> Result<GateConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_ENVIRONMENT) {
        config.environment = value.parse().map_err(|reason| ConfigError::Env {
            var: ENV_ENVIRONMENT,
            reason,
        })?;
    }

    resolve_secret(&mut config.auth.preview, &lookup);
    resolve_secret(&mut config.auth.admin, &lookup);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn resolve_secret<F>(gate: &mut GateSettings, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    // An empty variable is the same as an unset one: the gate fails closed.
    gate.password = lookup(&gate.password_env)
        .filter(|value| !value.is_empty())
        .map(Secret::new);
}
