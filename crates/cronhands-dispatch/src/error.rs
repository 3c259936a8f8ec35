//! Dispatch errors.

use cronhands_core::StoreError;
use cronhands_scheduler::ScheduleError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Job dependencies not satisfied: {0}")]
    DependenciesNotSatisfied(String),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
