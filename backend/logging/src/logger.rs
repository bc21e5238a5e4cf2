//! Structured Logger
//!
//! Wraps `tracing` with a human-readable console layer, an optional
//! daily-rolling NDJSON file, and `RUST_LOG` level control.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_PREFIX: &str = "dripforge.log";

/// Initialize the global logger.
///
/// `RUST_LOG` takes precedence over `level`. With a `log_dir`, events are
/// also written as NDJSON to `dripforge.log.YYYY-MM-DD` inside it. Calling
/// this more than once keeps the first subscriber.
pub fn init_logger(level: &str, log_dir: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| build_filter(level));

    let file_layer = log_dir.map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    // Console goes to stderr; stdout carries command output.
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

/// Filter for `level`, falling back to `info` when it does not parse.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_falls_back_to_info() {
        assert_eq!(build_filter("dripforge=loudest").to_string(), "info");
        assert_eq!(build_filter("debug").to_string(), "debug");
    }

    #[test]
    fn init_twice_does_not_panic() {
        let dir = std::env::temp_dir().join(format!("dripforge-logs-{}", std::process::id()));
        init_logger("warn", Some(&dir));
        init_logger("debug", None);
        tracing::warn!(lead_id = "l-1", "logger smoke test");
        std::fs::remove_dir_all(&dir).ok();
    }
}
