//! Config validation: deep schema checks with user-friendly error messages.

use thiserror::Error;

use crate::schema::DripforgeConfig;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &DripforgeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_campaign(config, &mut report);
    validate_smtp(config, &mut report);
    validate_discovery(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_campaign(config: &DripforgeConfig, report: &mut ValidationReport) {
    let campaign = &config.campaign;
    if campaign.step_delays().is_empty() {
        report.error("campaign.steps", "The campaign needs at least one step");
    }
    if campaign.steps.is_some() && campaign.step_delays_secs.is_some() {
        report.warn(
            "campaign.step_delays_secs",
            "Explicit step delays override campaign.steps and campaign.step_delay_secs",
        );
    }
    if campaign.retry_count() == 0 {
        report.warn("campaign.retry_count", "retry_count 0 is treated as a single attempt");
    }
    if campaign.concurrency() == 0 {
        report.error("campaign.concurrency", "concurrency must be >= 1");
    }
    if let Some(dir) = &campaign.template_dir {
        if !std::path::Path::new(dir).is_dir() {
            report.warn(
                "campaign.template_dir",
                format!("Template directory '{dir}' does not exist; built-in templates will be used"),
            );
        }
    }
}

/// Real sends need credentials; test mode never touches SMTP.
fn validate_smtp(config: &DripforgeConfig, report: &mut ValidationReport) {
    let smtp = &config.smtp;
    if !config.campaign.test_mode() && !smtp.has_credentials() {
        report.error(
            "smtp",
            "username, password and from_email are required when campaign.test_mode is false",
        );
    }
    if let Some(from) = &smtp.from_email {
        if !from.contains('@') {
            report.error("smtp.from_email", format!("'{from}' is not an email address"));
        }
    }
    if smtp.port() == 0 {
        report.error("smtp.port", "port must be > 0");
    }
}

fn validate_discovery(config: &DripforgeConfig, report: &mut ValidationReport) {
    let discovery = &config.discovery;
    if discovery.api_key.as_deref().map(str::is_empty).unwrap_or(true) {
        report.warn("discovery.api_key", "No Places API key; `discover` will not run");
    }
    let rating = discovery.min_rating();
    if !(0.0..=5.0).contains(&rating) {
        report.error("discovery.min_rating", format!("min_rating {rating} is outside 0-5"));
    }
    if discovery.max_results() == 0 {
        report.warn("discovery.max_results", "max_results 0 discards every result");
    }
}

fn validate_logging(config: &DripforgeConfig, report: &mut ValidationReport) {
    let level = config.logging.level();
    if !matches!(
        level.to_ascii_lowercase().as_str(),
        "error" | "warn" | "info" | "debug" | "trace"
    ) {
        report.error(
            "logging.level",
            format!("Unknown log level '{level}'. Use error, warn, info, debug or trace"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let report = validate(&DripforgeConfig::default());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.iter().any(|w| w.path == "discovery.api_key"));
    }

    #[test]
    fn production_without_credentials_is_error() {
        let mut cfg = DripforgeConfig::default();
        cfg.campaign.test_mode = Some(false);
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "smtp");
    }

    #[test]
    fn zero_steps_and_concurrency_are_errors() {
        let mut cfg = DripforgeConfig::default();
        cfg.campaign.steps = Some(0);
        cfg.campaign.concurrency = Some(0);
        let report = validate(&cfg);
        let paths: Vec<&str> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"campaign.steps"));
        assert!(paths.contains(&"campaign.concurrency"));
    }

    #[test]
    fn bad_log_level_is_error() {
        let mut cfg = DripforgeConfig::default();
        cfg.logging.level = Some("loud".into());
        assert!(!validate(&cfg).is_valid());
    }
}
