use super::*;
use cronhands_core::{DeliveryStatus, MemoryStore};
use parking_lot::Mutex;
use serde_json::json;

/// Records every message; fails when told to.
struct FakeProvider {
    channel: NotificationChannel,
    fail_with: Option<String>,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl FakeProvider {
    fn new(channel: NotificationChannel) -> Arc<Self> {
        Arc::new(Self {
            channel,
            fail_with: None,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn failing(channel: NotificationChannel, error: &str) -> Arc<Self> {
        Arc::new(Self {
            channel,
            fail_with: Some(error.to_string()),
            sent: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl ChannelProvider for FakeProvider {
    fn channel(&self) -> NotificationChannel {
        self.channel
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        self.sent.lock().push(message.clone());
        match &self.fail_with {
            Some(e) => Err(NotifyError::Delivery(e.clone())),
            None => Ok(()),
        }
    }
}

fn webhook_config(user: Uuid, recipient: &str) -> NotificationConfig {
    NotificationConfig::new(
        user,
        NotificationChannel::Webhook,
        json!({"recipient": recipient}),
    )
}

#[test]
fn test_render_subject() {
    assert_eq!(
        render_subject("backup", NotificationEvent::Failure),
        "Job 'backup' failure"
    );
}

#[test]
fn test_render_content_without_result() {
    assert_eq!(
        render_content("backup", NotificationEvent::Start, None),
        "Job 'backup' has start."
    );
}

#[test]
fn test_render_content_with_result() {
    let result = json!({
        "duration": 12.3,
        "return_code": 2,
        "error": "Exit code: 2",
        "stdout": "partial output",
        "stderr": null,
    });
    let content = render_content("backup", NotificationEvent::Failure, Some(&result));
    assert_eq!(
        content,
        "Job 'backup' has failure.\nDuration: 12s\nExit code: 2\nError: Exit code: 2\nOutput:\npartial output"
    );
}

#[test]
fn test_render_content_duration_in_whole_seconds() {
    let result = json!({"duration": 0.004123, "return_code": 0});
    assert_eq!(
        render_content("ping", NotificationEvent::Success, Some(&result)),
        "Job 'ping' has success.\nDuration: 0s\nExit code: 0"
    );
}

#[test]
fn test_render_content_skips_null_and_empty() {
    let result = json!({"return_code": null, "error": "", "stdout": ""});
    assert_eq!(
        render_content("sync", NotificationEvent::Success, Some(&result)),
        "Job 'sync' has success."
    );
}

#[test]
fn test_render_content_truncates_output() {
    let stdout = "x".repeat(OUTPUT_PREVIEW_CHARS + 10);
    let result = json!({"stdout": stdout});
    let content = render_content("sync", NotificationEvent::Success, Some(&result));
    let expected = format!(
        "Job 'sync' has success.\nOutput:\n{}\n... (truncated)",
        "x".repeat(OUTPUT_PREVIEW_CHARS)
    );
    assert_eq!(content, expected);
}

#[tokio::test]
async fn test_no_configs_no_logs() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Notifier::new(store.clone());
    let user = Uuid::new_v4();

    let logs = notifier
        .notify_event(user, "job", NotificationEvent::Failure, None, None, None)
        .await
        .unwrap();
    assert!(logs.is_empty());
    assert!(store.list_logs(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_only_subscribed_configs_fire() {
    let store = Arc::new(MemoryStore::new());
    let provider = FakeProvider::new(NotificationChannel::Webhook);
    let notifier = Notifier::new(store.clone()).with_provider(provider.clone());
    let user = Uuid::new_v4();
    let job = Uuid::new_v4();

    let global_success =
        webhook_config(user, "https://a.example.com").with_events(false, true, false);
    let scoped_success = webhook_config(user, "https://b.example.com")
        .for_job(job)
        .with_events(false, true, true);
    let failure_only = webhook_config(user, "https://c.example.com");
    let other_job = webhook_config(user, "https://d.example.com")
        .for_job(Uuid::new_v4())
        .with_events(true, true, true);
    let disabled = webhook_config(user, "https://e.example.com")
        .with_events(true, true, true)
        .with_enabled(false);
    for config in [&global_success, &scoped_success, &failure_only, &other_job, &disabled] {
        store.save_config(config).await.unwrap();
    }

    let execution = Uuid::new_v4();
    let logs = notifier
        .notify_event(user, "sync", NotificationEvent::Success, Some(job), Some(execution), None)
        .await
        .unwrap();

    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| l.status == DeliveryStatus::Sent));
    assert!(logs.iter().all(|l| l.execution_id == Some(execution)));

    let mut recipients: Vec<String> = provider
        .sent
        .lock()
        .iter()
        .map(|m| m.recipient.clone())
        .collect();
    recipients.sort();
    assert_eq!(recipients, vec!["https://a.example.com", "https://b.example.com"]);
    assert_eq!(store.list_logs(user).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_recipient_skipped() {
    let store = Arc::new(MemoryStore::new());
    let provider = FakeProvider::new(NotificationChannel::Webhook);
    let notifier = Notifier::new(store.clone()).with_provider(provider.clone());
    let user = Uuid::new_v4();

    store
        .save_config(&NotificationConfig::new(user, NotificationChannel::Webhook, json!({})))
        .await
        .unwrap();

    let logs = notifier
        .notify_event(user, "job", NotificationEvent::Failure, None, None, None)
        .await
        .unwrap();
    assert!(logs.is_empty());
    assert!(provider.sent.lock().is_empty());
    assert!(store.list_logs(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delivery_failure_recorded() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Notifier::new(store.clone())
        .with_provider(FakeProvider::failing(NotificationChannel::Webhook, "HTTP 500: boom"));
    let user = Uuid::new_v4();
    store
        .save_config(&webhook_config(user, "https://hooks.example.com"))
        .await
        .unwrap();

    let logs = notifier
        .notify_event(user, "job", NotificationEvent::Failure, None, None, None)
        .await
        .unwrap();

    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, DeliveryStatus::Failed);
    assert_eq!(logs[0].retry_count, 1);
    assert_eq!(logs[0].error_message.as_deref(), Some("HTTP 500: boom"));

    let stored = store.list_logs(user).await.unwrap();
    assert_eq!(stored[0].status, DeliveryStatus::Failed);
}

#[tokio::test]
async fn test_unknown_channel_recorded() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Notifier::new(store.clone());
    let user = Uuid::new_v4();
    store
        .save_config(&NotificationConfig::new(
            user,
            NotificationChannel::Sms,
            json!({"recipient": "+15551234567"}),
        ))
        .await
        .unwrap();

    let logs = notifier
        .notify_event(user, "job", NotificationEvent::Failure, None, None, None)
        .await
        .unwrap();

    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, DeliveryStatus::Failed);
    assert_eq!(logs[0].error_message.as_deref(), Some("Unknown channel: sms"));
}

#[tokio::test]
async fn test_message_carries_settings_and_ids() {
    let store = Arc::new(MemoryStore::new());
    let provider = FakeProvider::new(NotificationChannel::Webhook);
    let notifier = Notifier::new(store.clone()).with_provider(provider.clone());
    let user = Uuid::new_v4();
    let job = Uuid::new_v4();
    store
        .save_config(&NotificationConfig::new(
            user,
            NotificationChannel::Webhook,
            json!({"recipient": "https://hooks.example.com", "auth_token": "t"}),
        ).with_events(true, false, false))
        .await
        .unwrap();

    notifier
        .notify_event(user, "etl", NotificationEvent::Start, Some(job), None, None)
        .await
        .unwrap();

    let sent = provider.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Job 'etl' start");
    assert_eq!(sent[0].user_id, Some(user));
    assert_eq!(sent[0].job_id, Some(job));
    assert_eq!(sent[0].setting("auth_token"), Some("t"));
}

#[tokio::test]
async fn test_from_config_registers_all_channels() {
    let notifier = Notifier::from_config(Arc::new(MemoryStore::new()), &NotificationsConfig::default())
        .unwrap();
    assert!(notifier.has_provider(NotificationChannel::Email));
    assert!(notifier.has_provider(NotificationChannel::Webhook));
    assert!(notifier.has_provider(NotificationChannel::Sms));
}
