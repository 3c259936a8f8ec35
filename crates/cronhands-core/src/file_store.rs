//! File system store: one pretty-printed JSON file per record.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::execution::Execution;
use crate::job::Job;
use crate::notification::{NotificationConfig, NotificationLog};
use crate::store::{ExecutionStore, JobStore, NotificationStore};

/// Directory of `<id>.json` records of one type.
struct JsonDir<T> {
    dir: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonDir<T> {
    async fn open(dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            _marker: PhantomData,
        })
    }

    fn path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn contains(&self, id: Uuid) -> bool {
        self.path(id).exists()
    }

    async fn write(&self, id: Uuid, record: &T) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(record)?;
        fs::write(self.path(id), content).await?;
        Ok(())
    }

    async fn read(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let path = self.path(id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
        let path = self.path(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).await?;
        Ok(true)
    }

    /// Every readable record. Corrupt files are skipped with a warning.
    async fn read_all(&self) -> Result<Vec<T>, StoreError> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            match fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str::<T>(&content) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!("Failed to deserialize record from {:?}: {}", path, e),
                },
                Err(e) => warn!("Failed to read record file {:?}: {}", path, e),
            }
        }

        Ok(records)
    }
}

/// Store that survives restarts.
///
/// Layout under the root directory:
///
/// ```text
/// jobs/<id>.json
/// executions/<id>.json
/// notification_configs/<id>.json
/// notification_logs/<id>.json
/// ```
pub struct FileStore {
    root: PathBuf,
    jobs: JsonDir<Job>,
    executions: JsonDir<Execution>,
    configs: JsonDir<NotificationConfig>,
    logs: JsonDir<NotificationLog>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let store = Self {
            jobs: JsonDir::open(root.join("jobs")).await?,
            executions: JsonDir::open(root.join("executions")).await?,
            configs: JsonDir::open(root.join("notification_configs")).await?,
            logs: JsonDir::open(root.join("notification_logs")).await?,
            root,
        };
        debug!("FileStore initialized at {:?}", store.root);
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl JobStore for FileStore {
    async fn save_job(&self, job: &Job) -> Result<(), StoreError> {
        self.jobs.write(job.id, job).await?;
        debug!("Saved job '{}' ({})", job.name, job.id);
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        self.jobs.read(id).await
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let mut jobs = self.jobs.read_all().await?;
        jobs.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        debug!("Loaded {} jobs from {:?}", jobs.len(), self.root);
        Ok(jobs)
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError> {
        self.jobs.remove(id).await
    }
}

#[async_trait]
impl ExecutionStore for FileStore {
    async fn create_execution(&self, execution: &Execution) -> Result<(), StoreError> {
        self.executions.write(execution.id, execution).await
    }

    async fn get_execution(&self, id: Uuid) -> Result<Option<Execution>, StoreError> {
        self.executions.read(id).await
    }

    async fn update_execution(&self, execution: &Execution) -> Result<(), StoreError> {
        if !self.executions.contains(execution.id) {
            return Err(StoreError::NotFound(format!("execution {}", execution.id)));
        }
        self.executions.write(execution.id, execution).await
    }

    async fn list_executions(&self, job_id: Uuid) -> Result<Vec<Execution>, StoreError> {
        let mut executions: Vec<Execution> = self
            .executions
            .read_all()
            .await?
            .into_iter()
            .filter(|e| e.job_id == job_id)
            .collect();
        executions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(executions)
    }
}

#[async_trait]
impl NotificationStore for FileStore {
    async fn save_config(&self, config: &NotificationConfig) -> Result<(), StoreError> {
        self.configs.write(config.id, config).await
    }

    async fn list_configs(
        &self,
        user_id: Uuid,
        job_id: Option<Uuid>,
    ) -> Result<Vec<NotificationConfig>, StoreError> {
        let mut configs: Vec<NotificationConfig> = self
            .configs
            .read_all()
            .await?
            .into_iter()
            .filter(|c| c.user_id == user_id && c.applies_to(job_id))
            .collect();
        configs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(configs)
    }

    async fn delete_config(&self, id: Uuid) -> Result<bool, StoreError> {
        self.configs.remove(id).await
    }

    async fn create_log(&self, log: &NotificationLog) -> Result<(), StoreError> {
        self.logs.write(log.id, log).await
    }

    async fn update_log(&self, log: &NotificationLog) -> Result<(), StoreError> {
        if !self.logs.contains(log.id) {
            return Err(StoreError::NotFound(format!("notification log {}", log.id)));
        }
        self.logs.write(log.id, log).await
    }

    async fn list_logs(&self, user_id: Uuid) -> Result<Vec<NotificationLog>, StoreError> {
        let mut logs: Vec<NotificationLog> = self
            .logs
            .read_all()
            .await?
            .into_iter()
            .filter(|l| l.user_id == user_id)
            .collect();
        logs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(logs)
    }
}
