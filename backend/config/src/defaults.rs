//! Config defaults: applies sensible default values to parsed config.

use crate::schema::DripforgeConfig;

pub const DEFAULT_DATABASE_PATH: &str = "dripforge.db";

/// One day between steps in production.
pub const DEFAULT_STEP_DELAY_SECS: u64 = 86_400;

/// Step delay used in test mode when none is configured.
pub const DEFAULT_TEST_STEP_DELAY_SECS: u64 = 24;

pub const DEFAULT_STEPS: u32 = 3;
pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 0;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_TEST_MODE: bool = true;

pub const DEFAULT_SELLER_NAME: &str = "Alex";
pub const DEFAULT_COMPANY_NAME: &str = "Premium Dental Solutions";
pub const DEFAULT_LOCATION: &str = "London";

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_SEND_INTERVAL_MS: u64 = 5_000;

pub const DEFAULT_MIN_RATING: f64 = 4.7;
pub const DEFAULT_MIN_REVIEWS: u32 = 50;
pub const DEFAULT_MAX_RESULTS: usize = 20;
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_QUERY_DELAY_MS: u64 = 1_000;

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const DEFAULT_DISTRICTS: &[&str] = &[
    "Harley Street London",
    "Kensington London",
    "Chelsea London",
    "Mayfair London",
    "Knightsbridge London",
    "Belgravia London",
    "Marylebone London",
    "Soho London",
    "Notting Hill London",
    "Westminster London",
];

pub const DEFAULT_QUERIES: &[&str] = &[
    "cosmetic dentistry",
    "dental implants",
    "smile makeover clinic",
    "private dental studio",
    "aesthetic dentistry",
    "veneers",
    "Invisalign provider",
    "teeth whitening",
];

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: DripforgeConfig) -> DripforgeConfig {
    let config = apply_campaign_defaults(config);
    let config = apply_sender_defaults(config);
    let config = apply_smtp_defaults(config);
    let config = apply_discovery_defaults(config);
    apply_misc_defaults(config)
}

/// Campaign pacing. The step delay depends on `test_mode`, so that is settled first.
fn apply_campaign_defaults(mut config: DripforgeConfig) -> DripforgeConfig {
    let campaign = &mut config.campaign;
    let test_mode = *campaign.test_mode.get_or_insert(DEFAULT_TEST_MODE);
    campaign.step_delay_secs.get_or_insert(if test_mode {
        DEFAULT_TEST_STEP_DELAY_SECS
    } else {
        DEFAULT_STEP_DELAY_SECS
    });
    campaign.steps.get_or_insert(DEFAULT_STEPS);
    campaign.retry_count.get_or_insert(DEFAULT_RETRY_COUNT);
    campaign.retry_backoff_ms.get_or_insert(DEFAULT_RETRY_BACKOFF_MS);
    campaign.concurrency.get_or_insert(DEFAULT_CONCURRENCY);
    config
}

fn apply_sender_defaults(mut config: DripforgeConfig) -> DripforgeConfig {
    let sender = &mut config.sender;
    sender.seller_name.get_or_insert_with(|| DEFAULT_SELLER_NAME.to_string());
    sender.company_name.get_or_insert_with(|| DEFAULT_COMPANY_NAME.to_string());
    sender.default_location.get_or_insert_with(|| DEFAULT_LOCATION.to_string());
    config
}

fn apply_smtp_defaults(mut config: DripforgeConfig) -> DripforgeConfig {
    let smtp = &mut config.smtp;
    smtp.host.get_or_insert_with(|| DEFAULT_SMTP_HOST.to_string());
    smtp.port.get_or_insert(DEFAULT_SMTP_PORT);
    smtp.send_interval_ms.get_or_insert(DEFAULT_SEND_INTERVAL_MS);
    config
}

fn apply_discovery_defaults(mut config: DripforgeConfig) -> DripforgeConfig {
    let discovery = &mut config.discovery;
    if discovery.districts.is_empty() {
        discovery.districts = DEFAULT_DISTRICTS.iter().map(|s| s.to_string()).collect();
    }
    if discovery.queries.is_empty() {
        discovery.queries = DEFAULT_QUERIES.iter().map(|s| s.to_string()).collect();
    }
    discovery.min_rating.get_or_insert(DEFAULT_MIN_RATING);
    discovery.min_reviews.get_or_insert(DEFAULT_MIN_REVIEWS);
    discovery.max_results.get_or_insert(DEFAULT_MAX_RESULTS);
    discovery.language.get_or_insert_with(|| DEFAULT_LANGUAGE.to_string());
    discovery.query_delay_ms.get_or_insert(DEFAULT_QUERY_DELAY_MS);
    config
}

fn apply_misc_defaults(mut config: DripforgeConfig) -> DripforgeConfig {
    config
        .database
        .path
        .get_or_insert_with(|| DEFAULT_DATABASE_PATH.to_string());
    config.dry_run.delay_ms.get_or_insert(0);
    config
        .logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CampaignConfig;

    #[test]
    fn fills_every_campaign_field() {
        let cfg = apply_all_defaults(DripforgeConfig::default());
        assert_eq!(cfg.campaign.test_mode, Some(true));
        assert_eq!(cfg.campaign.step_delay_secs, Some(DEFAULT_TEST_STEP_DELAY_SECS));
        assert_eq!(cfg.campaign.retry_count, Some(3));
        assert_eq!(cfg.campaign.concurrency, Some(4));
        assert_eq!(cfg.database.path.as_deref(), Some("dripforge.db"));
    }

    #[test]
    fn production_mode_uses_daily_delay() {
        let mut cfg = DripforgeConfig::default();
        cfg.campaign = CampaignConfig {
            test_mode: Some(false),
            ..Default::default()
        };
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.campaign.step_delay_secs, Some(86_400));
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = DripforgeConfig::default();
        cfg.campaign.retry_count = Some(1);
        cfg.discovery.districts = vec!["Soho London".into()];
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.campaign.retry_count, Some(1));
        assert_eq!(cfg.discovery.districts, vec!["Soho London".to_string()]);
    }

    #[test]
    fn defaults_agree_with_accessors() {
        let raw = DripforgeConfig::default();
        let filled = apply_all_defaults(raw.clone());
        assert_eq!(raw.campaign.step_delays(), filled.campaign.step_delays());
        assert_eq!(raw.smtp.send_interval(), filled.smtp.send_interval());
        assert_eq!(raw.discovery.queries(), filled.discovery.queries);
    }
}
