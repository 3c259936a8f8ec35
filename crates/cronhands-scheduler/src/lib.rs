//! # Cronhands Scheduler
//!
//! Decides when jobs are due and hands them to a [`DispatchHandler`].
//!
//! - [`Trigger`]: next-fire-time computation for 5-field cron expressions
//!   (evaluated in an IANA timezone) and fixed intervals (`30s`, `5m`, `1h`, `2d`)
//! - [`TriggerScheduler`]: per-job registrations with pause/resume, a tick loop
//!   that tolerates misfires within a grace window, and at most one in-flight
//!   dispatch per job

mod error;
mod scheduler;
mod trigger;

pub use error::ScheduleError;
pub use scheduler::{DispatchHandler, ScheduledJob, SchedulerOptions, TriggerScheduler};
pub use trigger::{Trigger, parse_interval};
