//! Persistence interfaces and the in-memory store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::execution::Execution;
use crate::job::{Job, JobStatus};
use crate::notification::{NotificationConfig, NotificationLog};

/// Job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or replace a job.
    async fn save_job(&self, job: &Job) -> Result<(), StoreError>;

    /// Load a job by ID.
    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    /// Load all jobs.
    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError>;

    /// Delete a job. Returns whether it existed.
    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Load the jobs referenced by `ids`, skipping unknown ones.
    async fn get_jobs(&self, ids: &[Uuid]) -> Result<Vec<Job>, StoreError> {
        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(job) = self.get_job(*id).await? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    /// Set a job's status. Returns the updated job, or `None` if it is gone.
    async fn update_job_status(
        &self,
        id: Uuid,
        status: JobStatus,
    ) -> Result<Option<Job>, StoreError> {
        let Some(mut job) = self.get_job(id).await? else {
            return Ok(None);
        };
        job.set_status(status);
        self.save_job(&job).await?;
        Ok(Some(job))
    }
}

/// Execution records.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn create_execution(&self, execution: &Execution) -> Result<(), StoreError>;

    async fn get_execution(&self, id: Uuid) -> Result<Option<Execution>, StoreError>;

    /// Replace an existing execution. Fails with `NotFound` if it was never created.
    async fn update_execution(&self, execution: &Execution) -> Result<(), StoreError>;

    /// Executions of a job, newest first.
    async fn list_executions(&self, job_id: Uuid) -> Result<Vec<Execution>, StoreError>;
}

/// Notification configs and delivery logs.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn save_config(&self, config: &NotificationConfig) -> Result<(), StoreError>;

    /// A user's configs that apply to `job_id`: global ones plus those scoped to it.
    async fn list_configs(
        &self,
        user_id: Uuid,
        job_id: Option<Uuid>,
    ) -> Result<Vec<NotificationConfig>, StoreError>;

    async fn delete_config(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn create_log(&self, log: &NotificationLog) -> Result<(), StoreError>;

    async fn update_log(&self, log: &NotificationLog) -> Result<(), StoreError>;

    /// A user's delivery logs, oldest first.
    async fn list_logs(&self, user_id: Uuid) -> Result<Vec<NotificationLog>, StoreError>;
}

/// Everything the dispatch pipeline reads and writes.
pub trait Store: JobStore + ExecutionStore + NotificationStore {}

impl<T: JobStore + ExecutionStore + NotificationStore> Store for T {}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
    executions: RwLock<HashMap<Uuid, Execution>>,
    configs: RwLock<HashMap<Uuid, NotificationConfig>>,
    logs: RwLock<Vec<NotificationLog>>,
}

impl MemoryStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn save_job(&self, job: &Job) -> Result<(), StoreError> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        Ok(jobs)
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.jobs.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn create_execution(&self, execution: &Execution) -> Result<(), StoreError> {
        self.executions
            .write()
            .await
            .insert(execution.id, execution.clone());
        Ok(())
    }

    async fn get_execution(&self, id: Uuid) -> Result<Option<Execution>, StoreError> {
        Ok(self.executions.read().await.get(&id).cloned())
    }

    async fn update_execution(&self, execution: &Execution) -> Result<(), StoreError> {
        let mut executions = self.executions.write().await;
        match executions.get_mut(&execution.id) {
            Some(existing) => {
                *existing = execution.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("execution {}", execution.id))),
        }
    }

    async fn list_executions(&self, job_id: Uuid) -> Result<Vec<Execution>, StoreError> {
        let mut executions: Vec<Execution> = self
            .executions
            .read()
            .await
            .values()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect();
        executions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(executions)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn save_config(&self, config: &NotificationConfig) -> Result<(), StoreError> {
        self.configs.write().await.insert(config.id, config.clone());
        Ok(())
    }

    async fn list_configs(
        &self,
        user_id: Uuid,
        job_id: Option<Uuid>,
    ) -> Result<Vec<NotificationConfig>, StoreError> {
        let mut configs: Vec<NotificationConfig> = self
            .configs
            .read()
            .await
            .values()
            .filter(|c| c.user_id == user_id && c.applies_to(job_id))
            .cloned()
            .collect();
        configs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(configs)
    }

    async fn delete_config(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.configs.write().await.remove(&id).is_some())
    }

    async fn create_log(&self, log: &NotificationLog) -> Result<(), StoreError> {
        self.logs.write().await.push(log.clone());
        Ok(())
    }

    async fn update_log(&self, log: &NotificationLog) -> Result<(), StoreError> {
        let mut logs = self.logs.write().await;
        match logs.iter_mut().find(|l| l.id == log.id) {
            Some(existing) => {
                *existing = log.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("notification log {}", log.id))),
        }
    }

    async fn list_logs(&self, user_id: Uuid) -> Result<Vec<NotificationLog>, StoreError> {
        Ok(self
            .logs
            .read()
            .await
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
