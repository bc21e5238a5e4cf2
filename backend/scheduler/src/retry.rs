//! Bounded retry policy for delivery attempts: exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How many times a step is attempted within one pass, and how long to wait
/// between attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts per step per pass, the first one included.
    pub max_attempts: u32,
    /// Delay before the second attempt in milliseconds. Zero retries immediately.
    pub base_delay_ms: u64,
    /// Multiplier for each subsequent wait (exponential factor).
    pub backoff_factor: f64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Add random jitter (±25% of computed delay) to avoid thundering herd.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 0,
            backoff_factor: 2.0,
            max_delay_ms: 60_000,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy from the campaign settings. At least one attempt is always made.
    pub fn new(retry_count: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: retry_count.max(1),
            base_delay_ms: backoff.as_millis() as u64,
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt `attempt_number` (1-indexed).
    pub fn delay_for(&self, attempt_number: u32) -> Duration {
        if attempt_number == 0 || self.base_delay_ms == 0 {
            return Duration::ZERO;
        }
        let delay_ms = self.base_delay_ms as f64
            * self.backoff_factor.powi((attempt_number - 1) as i32);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64) as u64;

        let delay_ms = if self.jitter {
            let jitter = delay_ms / 4;
            if jitter > 0 {
                let offset = rand::thread_rng().gen_range(0..=jitter * 2) as i64 - jitter as i64;
                (delay_ms as i64 + offset).max(0) as u64
            } else {
                delay_ms
            }
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms)
    }

    pub fn should_retry(&self, attempt_number: u32) -> bool {
        attempt_number < self.max_attempts
    }
}
