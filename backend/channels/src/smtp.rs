//! SMTP delivery over STARTTLS using async `lettre`.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use dripforge_core::{DeliveryError, DeliveryGateway, RenderedMessage};

use crate::pacer::SendPacer;

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    /// Display name shown in the From header.
    pub from_name: String,
    pub send_interval: Duration,
}

pub struct SmtpGateway {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    pacer: SendPacer,
}

impl SmtpGateway {
    pub fn new(settings: SmtpSettings) -> Result<Self> {
        let address: Address = settings
            .from_email
            .parse()
            .with_context(|| format!("Invalid from address: {}", settings.from_email))?;
        let from = Mailbox::new(Some(settings.from_name.clone()), address);

        let creds = Credentials::new(settings.username.clone(), settings.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .with_context(|| format!("SMTP relay: {}", settings.host))?
            .port(settings.port)
            .credentials(creds)
            .build();

        info!(
            host = %settings.host,
            port = settings.port,
            from = %from,
            interval_ms = settings.send_interval.as_millis() as u64,
            "SMTP gateway ready"
        );
        Ok(Self {
            mailer,
            from,
            pacer: SendPacer::new(settings.send_interval),
        })
    }

    /// Connect, upgrade and authenticate without sending anything.
    pub async fn test_connection(&self) -> Result<()> {
        let answered = self
            .mailer
            .test_connection()
            .await
            .context("SMTP connection check failed")?;
        if !answered {
            bail!("SMTP server accepted the connection but did not answer NOOP");
        }
        Ok(())
    }

    fn build_message(
        &self,
        recipient: &str,
        message: &RenderedMessage,
    ) -> std::result::Result<Message, DeliveryError> {
        let to: Mailbox = recipient
            .trim()
            .parse()
            .map_err(|e| DeliveryError::Permanent(format!("invalid recipient '{recipient}': {e}")))?;

        let builder = Message::builder()
            .from(self.from.clone())
            .reply_to(self.from.clone())
            .to(to)
            .subject(message.subject.as_str());

        let built = match &message.body_html {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                message.body_text.clone(),
                html.clone(),
            )),
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(message.body_text.clone()),
        };
        built.map_err(|e| DeliveryError::Permanent(format!("build email: {e}")))
    }
}

#[async_trait]
impl DeliveryGateway for SmtpGateway {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(
        &self,
        recipient: &str,
        message: &RenderedMessage,
    ) -> std::result::Result<(), DeliveryError> {
        let email = self.build_message(recipient, message)?;
        self.pacer.wait_turn().await;

        match self.mailer.send(email).await {
            Ok(response) => {
                debug!(to = %recipient, code = %response.code(), "SMTP accepted message");
                Ok(())
            }
            Err(e) if e.is_permanent() => Err(DeliveryError::Permanent(format!("SMTP send: {e}"))),
            Err(e) => Err(DeliveryError::Transient(format!("SMTP send: {e}"))),
        }
    }
}
