//! Notification configuration and delivery log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Webhook,
    Sms,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Webhook => "webhook",
            NotificationChannel::Sms => "sms",
        }
    }
}

impl std::fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationEvent {
    Start,
    Success,
    Failure,
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEvent::Start => "start",
            NotificationEvent::Success => "success",
            NotificationEvent::Failure => "failure",
        }
    }
}

impl std::fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's subscription to job events on one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub id: Uuid,
    pub user_id: Uuid,
    /// `None` applies to every job the user owns.
    pub job_id: Option<Uuid>,
    pub channel: NotificationChannel,
    pub enabled: bool,
    pub on_start: bool,
    pub on_success: bool,
    pub on_failure: bool,
    /// Channel-specific settings. Must carry a non-empty `recipient`.
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl NotificationConfig {
    /// Create an enabled config that fires on failure only.
    pub fn new(user_id: Uuid, channel: NotificationChannel, config: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            job_id: None,
            channel,
            enabled: true,
            on_start: false,
            on_success: false,
            on_failure: true,
            config,
            created_at: Utc::now(),
        }
    }

    /// Scope the config to a single job.
    pub fn for_job(mut self, job_id: Uuid) -> Self {
        self.job_id = Some(job_id);
        self
    }

    /// Set which events trigger this config.
    pub fn with_events(mut self, on_start: bool, on_success: bool, on_failure: bool) -> Self {
        self.on_start = on_start;
        self.on_success = on_success;
        self.on_failure = on_failure;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether the flag for `event` is set.
    pub fn triggers_on(&self, event: NotificationEvent) -> bool {
        match event {
            NotificationEvent::Start => self.on_start,
            NotificationEvent::Success => self.on_success,
            NotificationEvent::Failure => self.on_failure,
        }
    }

    /// Global configs apply to every job; scoped ones only to their job.
    pub fn applies_to(&self, job_id: Option<Uuid>) -> bool {
        match self.job_id {
            None => true,
            Some(scope) => job_id == Some(scope),
        }
    }

    /// Non-empty `recipient` from the config blob.
    pub fn recipient(&self) -> Option<&str> {
        self.config
            .get("recipient")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Delivery status of a log row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Sent,
    Failed,
}

/// Audit row for one attempted delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Option<Uuid>,
    pub execution_id: Option<Uuid>,
    pub channel: NotificationChannel,
    pub event: NotificationEvent,
    pub status: DeliveryStatus,
    pub recipient: String,
    pub subject: String,
    pub content: String,
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl NotificationLog {
    /// Create a pending log row.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: Uuid,
        job_id: Option<Uuid>,
        execution_id: Option<Uuid>,
        channel: NotificationChannel,
        event: NotificationEvent,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            job_id,
            execution_id,
            channel,
            event,
            status: DeliveryStatus::Pending,
            recipient: recipient.into(),
            subject: subject.into(),
            content: content.into(),
            error_message: None,
            retry_count: 0,
            created_at: Utc::now(),
            sent_at: None,
        }
    }

    pub fn mark_sent(&mut self) {
        self.status = DeliveryStatus::Sent;
        self.sent_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = DeliveryStatus::Failed;
        self.error_message = Some(error.into());
        self.retry_count += 1;
    }
}
