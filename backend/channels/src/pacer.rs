//! Send pacing: a minimum interval between consecutive outbound messages.
//!
//! Mail providers flag bursts from a fresh sender as spam, so every gateway
//! send waits its turn here. Waiting callers are served one at a time.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(5);

pub struct SendPacer {
    interval: Duration,
    last_send: Mutex<Option<Instant>>,
}

impl SendPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_send: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until at least `interval` has passed since the previous send,
    /// then claim the slot. Returns how long the caller waited.
    pub async fn wait_turn(&self) -> Duration {
        let mut last = self.last_send.lock().await;
        let now = Instant::now();
        let waited = match *last {
            Some(prev) => {
                let ready_at = prev + self.interval;
                if ready_at > now {
                    let wait = ready_at - now;
                    debug!(wait_ms = wait.as_millis() as u64, "Pacing outbound send");
                    tokio::time::sleep(wait).await;
                    wait
                } else {
                    Duration::ZERO
                }
            }
            None => Duration::ZERO,
        };
        *last = Some(Instant::now());
        waited
    }
}

impl Default for SendPacer {
    fn default() -> Self {
        Self::new(DEFAULT_SEND_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_send_is_immediate() {
        let pacer = SendPacer::new(Duration::from_secs(60));
        assert_eq!(pacer.wait_turn().await, Duration::ZERO);
    }

    #[tokio::test]
    async fn consecutive_sends_are_spaced() {
        let pacer = SendPacer::new(Duration::from_millis(50));
        let start = Instant::now();
        pacer.wait_turn().await;
        pacer.wait_turn().await;
        pacer.wait_turn().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn zero_interval_never_waits() {
        let pacer = SendPacer::new(Duration::ZERO);
        pacer.wait_turn().await;
        assert_eq!(pacer.wait_turn().await, Duration::ZERO);
    }
}
