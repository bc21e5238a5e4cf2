//! `dripforge-config`: runtime configuration for dripforge.
//!
//! Provides:
//! - Typed config schema (database, campaign, sender, SMTP, discovery, logging)
//! - YAML loading from `~/.dripforge/config.yaml`
//! - `${ENV_VAR}` substitution
//! - Config redaction for safe display
//! - Default value application
//! - Validation with errors and warnings

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw};
pub use redact::{collect_redacted_paths, redact, redacted_config};
pub use schema::{
    CampaignConfig, DatabaseConfig, DiscoveryConfig, DripforgeConfig, DryRunConfig,
    LoggingConfig, SenderConfig, SmtpConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Load a config file, substitute env vars, and apply defaults.
///
/// This is the main entry point for loading a config at runtime. Validation
/// problems are logged; callers that must refuse an invalid config run
/// [`validate`] themselves.
pub async fn load_and_prepare(path: &Path) -> Result<DripforgeConfig> {
    let raw = load_raw(path).await?;
    let value = resolve_env_vars(&raw)
        .with_context(|| format!("Failed to resolve env vars in {}", path.display()))?;
    let config = from_value(value)
        .with_context(|| format!("Invalid config at {}", path.display()))?;

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    Ok(config)
}

fn from_value(value: Value) -> Result<DripforgeConfig> {
    let config: DripforgeConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;
    Ok(apply_all_defaults(config))
}
