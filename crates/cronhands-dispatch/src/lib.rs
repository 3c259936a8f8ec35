//! # Cronhands Dispatch
//!
//! Orchestrates a job run: [`DependencyGate`] check, `start` notification,
//! execution with retries, persisted result, then `success` or `failure`
//! notification.
//!
//! [`Dispatcher`] implements the scheduler's
//! [`DispatchHandler`](cronhands_scheduler::DispatchHandler) for scheduled
//! firings and also serves manual and webhook runs, boot-time schedule
//! reload and schedule changes.

mod dispatcher;
mod error;
mod gate;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use gate::{DependencyGate, DependencyReport, DependencyStatus, Verdict};
