//! Scheduler errors.

use thiserror::Error;
use uuid::Uuid;

/// Scheduler error types.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Cron expression could not be parsed.
    #[error("Invalid cron expression '{expression}': {message}")]
    InvalidCron { expression: String, message: String },

    /// Interval expression could not be parsed.
    #[error("Invalid interval '{expression}': {message}")]
    InvalidInterval { expression: String, message: String },

    /// Unknown IANA timezone.
    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    /// Job has no registration.
    #[error("Job not scheduled: {0}")]
    NotScheduled(Uuid),

    /// `start` was called twice.
    #[error("Scheduler is already running")]
    AlreadyRunning,
}
