//! dripforge configuration schema.
//!
//! Every field is optional in the file. `defaults::apply_all_defaults` fills
//! the gaps after loading, and the accessor methods fall back to the same
//! defaults so a hand-built config behaves identically.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::*;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DripforgeConfig {
    pub database: DatabaseConfig,
    pub campaign: CampaignConfig,
    pub sender: SenderConfig,
    pub smtp: SmtpConfig,
    pub dry_run: DryRunConfig,
    pub discovery: DiscoveryConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl DatabaseConfig {
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or(DEFAULT_DATABASE_PATH)
    }
}

// ---------------------------------------------------------------------------
// Campaign
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    /// Delay between consecutive steps, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_delay_secs: Option<u64>,

    /// Number of steps in the uniform catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,

    /// Per-step delays in seconds, overriding `steps` and `step_delay_secs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_delays_secs: Option<Vec<u64>>,

    /// Delivery attempts per step within one pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_backoff_ms: Option<u64>,

    /// Leads processed concurrently within a pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Directory of `{template_id}.txt` overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<String>,

    /// Send through the dry-run gateway instead of SMTP.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_mode: Option<bool>,
}

impl CampaignConfig {
    pub fn test_mode(&self) -> bool {
        self.test_mode.unwrap_or(DEFAULT_TEST_MODE)
    }

    pub fn step_delay(&self) -> Duration {
        let secs = self.step_delay_secs.unwrap_or(if self.test_mode() {
            DEFAULT_TEST_STEP_DELAY_SECS
        } else {
            DEFAULT_STEP_DELAY_SECS
        });
        Duration::from_secs(secs)
    }

    pub fn steps(&self) -> u32 {
        self.steps.unwrap_or(DEFAULT_STEPS)
    }

    /// Delay before each step. The first step of a uniform catalog has none.
    pub fn step_delays(&self) -> Vec<Duration> {
        match &self.step_delays_secs {
            Some(delays) => delays.iter().map(|s| Duration::from_secs(*s)).collect(),
            None => {
                let delay = self.step_delay();
                (0..self.steps())
                    .map(|i| if i == 0 { Duration::ZERO } else { delay })
                    .collect()
            }
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count.unwrap_or(DEFAULT_RETRY_COUNT)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.unwrap_or(DEFAULT_RETRY_BACKOFF_MS))
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(DEFAULT_CONCURRENCY)
    }
}

// ---------------------------------------------------------------------------
// Sender identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,

    /// Location used in templates when the lead address names no known area.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_location: Option<String>,
}

impl SenderConfig {
    pub fn seller_name(&self) -> &str {
        self.seller_name.as_deref().unwrap_or(DEFAULT_SELLER_NAME)
    }

    pub fn company_name(&self) -> &str {
        self.company_name.as_deref().unwrap_or(DEFAULT_COMPANY_NAME)
    }

    pub fn default_location(&self) -> &str {
        self.default_location.as_deref().unwrap_or(DEFAULT_LOCATION)
    }
}

// ---------------------------------------------------------------------------
// SMTP
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_email: Option<String>,

    /// Minimum spacing between two outbound messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_interval_ms: Option<u64>,
}

impl SmtpConfig {
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_SMTP_HOST)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SMTP_PORT)
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms.unwrap_or(DEFAULT_SEND_INTERVAL_MS))
    }

    /// Username, password and sender address are all present.
    pub fn has_credentials(&self) -> bool {
        [&self.username, &self.password, &self.from_email]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DryRunConfig {
    /// Simulated send latency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

impl DryRunConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.unwrap_or(0))
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Google Places API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub districts: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_reviews: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Pause between two search queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_delay_ms: Option<u64>,
}

impl DiscoveryConfig {
    pub fn districts(&self) -> Vec<String> {
        if self.districts.is_empty() {
            DEFAULT_DISTRICTS.iter().map(|s| s.to_string()).collect()
        } else {
            self.districts.clone()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        if self.queries.is_empty() {
            DEFAULT_QUERIES.iter().map(|s| s.to_string()).collect()
        } else {
            self.queries.clone()
        }
    }

    pub fn min_rating(&self) -> f64 {
        self.min_rating.unwrap_or(DEFAULT_MIN_RATING)
    }

    pub fn min_reviews(&self) -> u32 {
        self.min_reviews.unwrap_or(DEFAULT_MIN_REVIEWS)
    }

    pub fn max_results(&self) -> usize {
        self.max_results.unwrap_or(DEFAULT_MAX_RESULTS)
    }

    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn query_delay(&self) -> Duration {
        Duration::from_millis(self.query_delay_ms.unwrap_or(DEFAULT_QUERY_DELAY_MS))
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for the daily-rolling NDJSON log file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_yaml() {
        let yaml = r#"
campaign:
  steps: 4
  test_mode: false
smtp:
  username: outreach@example.com
discovery:
  districts: ["Mayfair London"]
"#;
        let cfg: DripforgeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.campaign.steps(), 4);
        assert!(!cfg.campaign.test_mode());
        assert_eq!(cfg.campaign.step_delay(), Duration::from_secs(DEFAULT_STEP_DELAY_SECS));
        assert_eq!(cfg.smtp.port(), 587);
        assert_eq!(cfg.discovery.districts(), vec!["Mayfair London".to_string()]);
        assert_eq!(cfg.discovery.queries().len(), DEFAULT_QUERIES.len());
    }

    #[test]
    fn test_mode_shortens_step_delay() {
        let cfg = DripforgeConfig::default();
        assert!(cfg.campaign.test_mode());
        assert_eq!(cfg.campaign.step_delay(), Duration::from_secs(24));
    }

    #[test]
    fn uniform_delays_start_at_zero() {
        let campaign = CampaignConfig {
            steps: Some(3),
            step_delay_secs: Some(10),
            ..Default::default()
        };
        let secs: Vec<u64> = campaign.step_delays().iter().map(|d| d.as_secs()).collect();
        assert_eq!(secs, vec![0, 10, 10]);
    }

    #[test]
    fn explicit_delays_win() {
        let campaign = CampaignConfig {
            steps: Some(5),
            step_delays_secs: Some(vec![0, 60]),
            ..Default::default()
        };
        assert_eq!(campaign.step_delays().len(), 2);
    }

    #[test]
    fn credentials_need_all_three_fields() {
        let mut smtp = SmtpConfig {
            username: Some("u".into()),
            password: Some("p".into()),
            ..Default::default()
        };
        assert!(!smtp.has_credentials());
        smtp.from_email = Some("me@example.com".into());
        assert!(smtp.has_credentials());
    }
}
