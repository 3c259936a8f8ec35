//! Notification channel configuration.

use serde::{Deserialize, Serialize};

use super::default_true;

/// Settings for every channel provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default)]
    pub sms: SmsConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// SMTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Empty disables the email channel.
    #[serde(default)]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// STARTTLS when true, plaintext otherwise.
    #[serde(default = "default_true")]
    pub use_tls: bool,

    /// Sender address. Falls back to `username`.
    #[serde(default)]
    pub from: String,
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        !self.smtp_host.is_empty()
    }

    pub fn sender(&self) -> &str {
        if self.from.is_empty() {
            &self.username
        } else {
            &self.from
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            use_tls: default_true(),
            from: String::new(),
        }
    }
}

/// Twilio-compatible SMS gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default)]
    pub account_sid: String,

    #[serde(default)]
    pub auth_token: String,

    #[serde(default)]
    pub from_number: String,

    #[serde(default = "default_sms_api_base")]
    pub api_base: String,
}

impl SmsConfig {
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }
}

fn default_sms_api_base() -> String {
    "https://api.twilio.com".to_string()
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            api_base: default_sms_api_base(),
        }
    }
}

/// Outbound webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per delivery.
    #[serde(default = "default_webhook_max_retries")]
    pub max_retries: u32,
}

fn default_webhook_timeout_secs() -> u64 {
    30
}

fn default_webhook_max_retries() -> u32 {
    3
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_webhook_timeout_secs(),
            max_retries: default_webhook_max_retries(),
        }
    }
}
