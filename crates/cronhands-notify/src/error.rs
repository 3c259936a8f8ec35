//! Notification error types.

use cronhands_core::StoreError;
use thiserror::Error;

/// Errors raised while delivering notifications.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{0} channel is not configured")]
    NotConfigured(&'static str),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("{0}")]
    Delivery(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
