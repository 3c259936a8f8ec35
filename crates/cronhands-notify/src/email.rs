//! SMTP email provider.

use async_trait::async_trait;
use cronhands_config::EmailConfig;
use cronhands_core::NotificationChannel;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::error::NotifyError;
use crate::provider::{ChannelProvider, OutboundMessage};

/// Sends plain-text mail through the configured SMTP relay.
pub struct EmailProvider {
    config: EmailConfig,
}

impl EmailProvider {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, message: &OutboundMessage) -> Result<Message, NotifyError> {
        let from: Mailbox = self
            .config
            .sender()
            .parse()
            .map_err(|e| NotifyError::Delivery(format!("Invalid sender address: {}", e)))?;
        let to: Mailbox = message
            .recipient
            .parse()
            .map_err(|_| NotifyError::InvalidRecipient(message.recipient.clone()))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(message.content.clone())
            .map_err(|e| NotifyError::Delivery(format!("Failed to build email: {}", e)))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
        let host = self.config.smtp_host.as_str();
        let builder = if self.config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| NotifyError::Delivery(format!("SMTP relay: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };

        let mut builder = builder.port(self.config.smtp_port);
        if !self.config.username.is_empty() && !self.config.password.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ));
        }
        Ok(builder.build())
    }
}

#[async_trait]
impl ChannelProvider for EmailProvider {
    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Email
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        if !self.config.is_configured() {
            return Err(NotifyError::NotConfigured("email"));
        }

        let email = self.build_message(message)?;
        self.transport()?
            .send(email)
            .await
            .map_err(|e| NotifyError::Delivery(format!("SMTP send failed: {}", e)))?;

        debug!(recipient = %message.recipient, "Email sent");
        Ok(())
    }
}
