//! Test-mode gateway: logs what would be sent and always succeeds.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use dripforge_core::{DeliveryError, DeliveryGateway, RenderedMessage};

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Default)]
pub struct DryRunGateway {
    delay: Duration,
    sent: AtomicUsize,
}

impl DryRunGateway {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            sent: AtomicUsize::new(0),
        }
    }

    /// Messages "sent" so far.
    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DeliveryGateway for DryRunGateway {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn send(&self, recipient: &str, message: &RenderedMessage) -> Result<(), DeliveryError> {
        let preview: String = message.body_text.chars().take(PREVIEW_CHARS).collect();
        info!(
            to = %recipient,
            subject = %message.subject,
            preview = %preview,
            "TEST MODE: message not sent"
        );
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_succeeds_and_counts() {
        let gateway = DryRunGateway::new(Duration::from_millis(5));
        let message = RenderedMessage {
            subject: "Hi".into(),
            body_text: "x".repeat(500),
            body_html: None,
        };
        gateway.send("a@b.co.uk", &message).await.unwrap();
        gateway.send("not-even-an-address", &message).await.unwrap();
        assert_eq!(gateway.sent_count(), 2);
        assert_eq!(gateway.name(), "dry-run");
    }
}
