//! Channel provider interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cronhands_core::{NotificationChannel, NotificationEvent};
use serde_json::Value;
use uuid::Uuid;

use crate::error::NotifyError;

/// One rendered notification addressed to one recipient.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub recipient: String,
    pub subject: String,
    pub content: String,
    pub event: NotificationEvent,
    pub job_id: Option<Uuid>,
    pub execution_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    /// Channel settings from the subscribing config (headers, tokens, metadata).
    pub settings: Value,
}

impl OutboundMessage {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
        event: NotificationEvent,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            content: content.into(),
            event,
            job_id: None,
            execution_id: None,
            user_id: None,
            timestamp: Utc::now(),
            settings: Value::Null,
        }
    }

    pub fn with_ids(
        mut self,
        user_id: Option<Uuid>,
        job_id: Option<Uuid>,
        execution_id: Option<Uuid>,
    ) -> Self {
        self.user_id = user_id;
        self.job_id = job_id;
        self.execution_id = execution_id;
        self
    }

    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = settings;
        self
    }

    /// String value from the channel settings.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// A delivery mechanism for one channel.
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    /// Channel this provider serves.
    fn channel(&self) -> NotificationChannel;

    /// Deliver a message. `Ok` means the remote side accepted it.
    async fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError>;
}
