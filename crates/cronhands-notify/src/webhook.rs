//! Outbound HTTP webhook provider.

use std::time::Duration;

use async_trait::async_trait;
use cronhands_config::WebhookConfig;
use cronhands_core::NotificationChannel;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::error::NotifyError;
use crate::provider::{ChannelProvider, OutboundMessage};

/// User agent sent with every webhook call.
pub const WEBHOOK_USER_AGENT: &str = concat!("cronhands-webhook/", env!("CARGO_PKG_VERSION"));

/// POSTs a JSON event to the recipient URL.
pub struct WebhookProvider {
    client: reqwest::Client,
    max_retries: u32,
}

impl WebhookProvider {
    pub fn new(config: &WebhookConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(WEBHOOK_USER_AGENT)
            .build()
            .map_err(|e| NotifyError::Delivery(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            max_retries: config.max_retries.max(1),
        })
    }

    /// JSON body for `message`. Absent ids are left out.
    pub fn payload(message: &OutboundMessage) -> Value {
        let mut payload = Map::new();
        payload.insert("event".into(), json!(message.event.as_str()));
        payload.insert("subject".into(), json!(message.subject));
        payload.insert("message".into(), json!(message.content));
        payload.insert("timestamp".into(), json!(message.timestamp.to_rfc3339()));
        if let Some(id) = message.job_id {
            payload.insert("job_id".into(), json!(id.to_string()));
        }
        if let Some(id) = message.execution_id {
            payload.insert("execution_id".into(), json!(id.to_string()));
        }
        if let Some(id) = message.user_id {
            payload.insert("user_id".into(), json!(id.to_string()));
        }
        payload.insert("status".into(), json!(message.event.as_str()));
        payload.insert(
            "metadata".into(),
            message
                .settings
                .get("metadata")
                .cloned()
                .unwrap_or_else(|| json!({})),
        );
        Value::Object(payload)
    }

    async fn post_once(&self, message: &OutboundMessage, payload: &Value) -> Result<(), String> {
        let mut request = self.client.post(&message.recipient).json(payload);

        if let Some(headers) = message.settings.get("headers").and_then(Value::as_object) {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(name.as_str(), value);
                }
            }
        }
        if let Some(token) = message.setting("auth_token") {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(format!("HTTP {}: {}", status.as_u16(), body))
        }
    }
}

#[async_trait]
impl ChannelProvider for WebhookProvider {
    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Webhook
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        if !message.recipient.starts_with("http://") && !message.recipient.starts_with("https://") {
            return Err(NotifyError::InvalidRecipient(message.recipient.clone()));
        }

        let payload = Self::payload(message);
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            match self.post_once(message, &payload).await {
                Ok(()) => {
                    debug!(url = %message.recipient, attempt, "Webhook delivered");
                    return Ok(());
                }
                Err(e) => {
                    warn!(url = %message.recipient, attempt, error = %e, "Webhook attempt failed");
                    last_error = e;
                }
            }
        }

        Err(NotifyError::Delivery(last_error))
    }
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
