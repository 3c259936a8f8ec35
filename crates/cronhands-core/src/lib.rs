//! # Cronhands Core
//!
//! Shared data model and persistence interfaces for the cronhands scheduler.
//!
//! ## Records
//!
//! - [`Job`]: a recurring shell command with a schedule, retry policy and
//!   dependencies on other jobs
//! - [`Execution`]: one dispatch of a job, possibly spanning several attempts
//! - [`NotificationConfig`]: a user's subscription to job lifecycle events
//! - [`NotificationLog`]: append-only audit row per attempted delivery
//!
//! The store itself is an external collaborator; this crate only defines the
//! traits the scheduler needs plus in-memory and JSON-file implementations.

pub mod error;
pub mod execution;
pub mod file_store;
pub mod job;
pub mod notification;
pub mod store;

pub use error::StoreError;
pub use execution::{Execution, ExecutionResult, ExecutionStatus, ExecutionTrigger};
pub use file_store::FileStore;
pub use job::{Job, JobStatus, ScheduleKind, ScheduleSpec};
pub use notification::{
    DeliveryStatus, NotificationChannel, NotificationConfig, NotificationEvent, NotificationLog,
};
pub use store::{ExecutionStore, JobStore, MemoryStore, NotificationStore, Store};
