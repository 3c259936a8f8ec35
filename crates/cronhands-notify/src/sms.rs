//! SMS provider for Twilio-compatible REST gateways.

use std::sync::LazyLock;

use async_trait::async_trait;
use cronhands_config::SmsConfig;
use cronhands_core::NotificationChannel;
use regex::Regex;
use tracing::debug;

use crate::error::NotifyError;
use crate::provider::{ChannelProvider, OutboundMessage};

/// Longest body the gateway accepts, in characters.
pub const MAX_SMS_LENGTH: usize = 1600;

static E164_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("valid E.164 regex"));

/// Prefix `+` when missing.
pub fn normalize_phone_number(number: &str) -> String {
    let number = number.trim();
    if number.starts_with('+') {
        number.to_string()
    } else {
        format!("+{}", number)
    }
}

pub fn is_valid_phone_number(number: &str) -> bool {
    E164_RE.is_match(number)
}

/// Sends text messages through the gateway's `Messages` resource.
pub struct SmsProvider {
    config: SmsConfig,
    client: reqwest::Client,
}

impl SmsProvider {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl ChannelProvider for SmsProvider {
    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Sms
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        if !self.config.is_configured() {
            return Err(NotifyError::NotConfigured("sms"));
        }

        let to = normalize_phone_number(&message.recipient);
        if !is_valid_phone_number(&to) {
            return Err(NotifyError::InvalidRecipient(message.recipient.clone()));
        }
        let body: String = message.content.chars().take(MAX_SMS_LENGTH).collect();

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to.as_str()),
                ("From", self.config.from_number.as_str()),
                ("Body", body.as_str()),
            ])
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(format!("SMS request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            debug!(to = %to, "SMS sent");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Delivery(format!(
                "SMS gateway returned {}: {}",
                status, body
            )))
        }
    }
}
