//! # Cronhands Notify
//!
//! Lifecycle notification fan-out for cronhands jobs.
//!
//! [`Notifier::notify_event`] picks the user's enabled configs subscribed to
//! an event, renders one subject and body, and hands a message to the
//! [`ChannelProvider`] for each config's channel. Every attempted delivery
//! leaves a [`NotificationLog`](cronhands_core::NotificationLog) row.
//!
//! Providers: [`EmailProvider`] (SMTP), [`WebhookProvider`] (JSON over HTTP)
//! and [`SmsProvider`] (Twilio-compatible REST).

pub mod email;
pub mod error;
pub mod notifier;
pub mod provider;
pub mod sms;
pub mod webhook;

pub use email::EmailProvider;
pub use error::NotifyError;
pub use notifier::{Notifier, OUTPUT_PREVIEW_CHARS, render_content, render_subject};
pub use provider::{ChannelProvider, OutboundMessage};
pub use sms::{MAX_SMS_LENGTH, SmsProvider, is_valid_phone_number, normalize_phone_number};
pub use webhook::{WEBHOOK_USER_AGENT, WebhookProvider};
