//! Lifecycle event fan-out across a user's notification configs.

use std::collections::HashMap;
use std::sync::Arc;

use cronhands_config::NotificationsConfig;
use cronhands_core::{
    NotificationChannel, NotificationConfig, NotificationEvent, NotificationLog, NotificationStore,
};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::email::EmailProvider;
use crate::error::NotifyError;
use crate::provider::{ChannelProvider, OutboundMessage};
use crate::sms::SmsProvider;
use crate::webhook::WebhookProvider;

/// Characters of stdout included in a notification body.
pub const OUTPUT_PREVIEW_CHARS: usize = 500;

const PREVIEW_TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Subject line for a job event.
pub fn render_subject(job_name: &str, event: NotificationEvent) -> String {
    format!("Job '{}' {}", job_name, event)
}

/// Body for a job event, with result details when a payload is given.
pub fn render_content(job_name: &str, event: NotificationEvent, result: Option<&Value>) -> String {
    let mut content = format!("Job '{}' has {}.", job_name, event);
    let Some(result) = result else {
        return content;
    };

    if let Some(secs) = result.get("duration").and_then(Value::as_f64) {
        content.push_str(&format!("\nDuration: {:.0}s", secs));
    } else if let Some(duration) = field(result, "duration") {
        content.push_str(&format!("\nDuration: {}s", duration));
    }
    if let Some(code) = field(result, "return_code") {
        content.push_str(&format!("\nExit code: {}", code));
    }
    if let Some(error) = field(result, "error").filter(|e| !e.is_empty()) {
        content.push_str(&format!("\nError: {}", error));
    }
    if let Some(stdout) = field(result, "stdout").filter(|s| !s.is_empty()) {
        let preview: String = stdout.chars().take(OUTPUT_PREVIEW_CHARS).collect();
        content.push_str(&format!("\nOutput:\n{}", preview));
        if stdout.chars().count() > OUTPUT_PREVIEW_CHARS {
            content.push_str(PREVIEW_TRUNCATION_MARKER);
        }
    }
    content
}

/// Non-null payload field as display text. Strings are taken unquoted.
fn field(result: &Value, key: &str) -> Option<String> {
    match result.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Selects matching configs and hands each one to its channel provider.
pub struct Notifier {
    store: Arc<dyn NotificationStore>,
    providers: HashMap<NotificationChannel, Arc<dyn ChannelProvider>>,
}

impl Notifier {
    /// A notifier with no providers registered.
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self {
            store,
            providers: HashMap::new(),
        }
    }

    /// A notifier with the email, webhook and SMS providers.
    pub fn from_config(
        store: Arc<dyn NotificationStore>,
        config: &NotificationsConfig,
    ) -> Result<Self, NotifyError> {
        Ok(Self::new(store)
            .with_provider(Arc::new(EmailProvider::new(config.email.clone())))
            .with_provider(Arc::new(WebhookProvider::new(&config.webhook)?))
            .with_provider(Arc::new(SmsProvider::new(config.sms.clone()))))
    }

    /// Register `provider` for its channel, replacing any previous one.
    pub fn with_provider(mut self, provider: Arc<dyn ChannelProvider>) -> Self {
        self.providers.insert(provider.channel(), provider);
        self
    }

    pub fn has_provider(&self, channel: NotificationChannel) -> bool {
        self.providers.contains_key(&channel)
    }

    /// Notify every enabled config of `user_id` subscribed to `event`.
    ///
    /// Returns one log row per config that had a recipient, whatever the
    /// delivery outcome. Only store failures are errors.
    pub async fn notify_event(
        &self,
        user_id: Uuid,
        job_name: &str,
        event: NotificationEvent,
        job_id: Option<Uuid>,
        execution_id: Option<Uuid>,
        result: Option<&Value>,
    ) -> Result<Vec<NotificationLog>, NotifyError> {
        let configs: Vec<NotificationConfig> = self
            .store
            .list_configs(user_id, job_id)
            .await?
            .into_iter()
            .filter(|c| c.enabled && c.triggers_on(event))
            .collect();

        if configs.is_empty() {
            debug!(%user_id, %event, "No notification configs for event");
            return Ok(Vec::new());
        }

        let subject = render_subject(job_name, event);
        let content = render_content(job_name, event, result);
        let mut logs = Vec::with_capacity(configs.len());

        for config in &configs {
            let Some(recipient) = config.recipient() else {
                debug!(config_id = %config.id, "Notification config has no recipient, skipping");
                continue;
            };

            let message = OutboundMessage::new(recipient, &subject, &content, event)
                .with_ids(Some(user_id), job_id, execution_id)
                .with_settings(config.config.clone());
            logs.push(self.deliver(user_id, config.channel, message).await?);
        }

        info!(%user_id, %event, job = job_name, sent = logs.len(), "Notifications processed");
        Ok(logs)
    }

    async fn deliver(
        &self,
        user_id: Uuid,
        channel: NotificationChannel,
        message: OutboundMessage,
    ) -> Result<NotificationLog, NotifyError> {
        let mut log = NotificationLog::new(
            user_id,
            message.job_id,
            message.execution_id,
            channel,
            message.event,
            &message.recipient,
            &message.subject,
            &message.content,
        );
        self.store.create_log(&log).await?;

        match self.providers.get(&channel) {
            None => log.mark_failed(format!("Unknown channel: {}", channel)),
            Some(provider) => match provider.send(&message).await {
                Ok(()) => log.mark_sent(),
                Err(e) => {
                    warn!(%channel, recipient = %message.recipient, error = %e, "Notification delivery failed");
                    log.mark_failed(e.to_string());
                }
            },
        }

        self.store.update_log(&log).await?;
        Ok(log)
    }
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
