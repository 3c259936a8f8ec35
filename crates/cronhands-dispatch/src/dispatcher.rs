//! Job pipeline: gate, start notification, execution, result notification.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cronhands_core::{
    Execution, ExecutionResult, ExecutionStatus, ExecutionTrigger, Job, JobStatus, NotificationEvent, Store,
};
use cronhands_executor::TaskExecutor;
use cronhands_notify::Notifier;
use cronhands_scheduler::{DispatchHandler, TriggerScheduler};
use serde_json::{Value, json};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::DispatchError;
use crate::gate::{DependencyGate, DependencyReport, Verdict};

/// Connects the scheduler to the store, gate, executor and notifier.
pub struct Dispatcher {
    store: Arc<dyn Store>,
    gate: DependencyGate,
    executor: Arc<TaskExecutor>,
    scheduler: Arc<TriggerScheduler>,
    notifier: Arc<Notifier>,
    retry_delay: Duration,
    tasks: TaskTracker,
}

impl Dispatcher {
    pub fn new<S: Store + 'static>(
        store: Arc<S>,
        executor: Arc<TaskExecutor>,
        scheduler: Arc<TriggerScheduler>,
        notifier: Arc<Notifier>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            gate: DependencyGate::new(store.clone()),
            store,
            executor,
            scheduler,
            notifier,
            retry_delay,
            tasks: TaskTracker::new(),
        }
    }

    pub fn scheduler(&self) -> &Arc<TriggerScheduler> {
        &self.scheduler
    }

    pub fn executor(&self) -> &Arc<TaskExecutor> {
        &self.executor
    }

    pub fn gate(&self) -> &DependencyGate {
        &self.gate
    }

    /// Register every active job with the scheduler.
    ///
    /// Jobs whose schedule fails to parse are logged and skipped. Returns
    /// the number registered.
    pub async fn reload_schedules(&self) -> Result<usize, DispatchError> {
        let jobs = self.store.list_jobs().await?;
        let active: Vec<&Job> = jobs.iter().filter(|job| job.is_active).collect();
        info!("Found {} active jobs", active.len());

        let mut registered = 0;
        for job in active {
            match self.scheduler.add(job.id, &job.schedule) {
                Ok(next_fire_time) => {
                    debug!(job_id = %job.id, name = %job.name, ?next_fire_time, "Loaded job");
                    registered += 1;
                }
                Err(e) => {
                    error!(job_id = %job.id, name = %job.name, error = %e, "Failed to load job into scheduler");
                }
            }
        }

        info!("Loaded {} jobs into scheduler", registered);
        Ok(registered)
    }

    /// Persist a created or edited job and bring its registration in line.
    ///
    /// Inactive jobs are unscheduled. Returns the next fire time.
    pub async fn apply_job_update(
        &self,
        job: &Job,
    ) -> Result<Option<DateTime<Utc>>, DispatchError> {
        self.store.save_job(job).await?;
        self.scheduler.remove(job.id);
        if !job.is_active {
            info!(job_id = %job.id, "Job inactive, not scheduled");
            return Ok(None);
        }
        Ok(self.scheduler.add(job.id, &job.schedule)?)
    }

    /// Unschedule then delete a job. Returns whether the record existed.
    pub async fn delete_job(&self, job_id: Uuid) -> Result<bool, DispatchError> {
        self.scheduler.remove(job_id);
        Ok(self.store.delete_job(job_id).await?)
    }

    /// Stop future firings and mark the job pending.
    pub async fn pause_job(&self, job_id: Uuid) -> Result<(), DispatchError> {
        self.scheduler.pause(job_id)?;
        self.store.update_job_status(job_id, JobStatus::Pending).await?;
        Ok(())
    }

    pub async fn resume_job(&self, job_id: Uuid) -> Result<Option<DateTime<Utc>>, DispatchError> {
        Ok(self.scheduler.resume(job_id)?)
    }

    pub async fn dependency_report(&self, job_id: Uuid) -> Result<DependencyReport, DispatchError> {
        Ok(self.gate.report(job_id).await?)
    }

    /// Run a job outside its schedule.
    ///
    /// The gate is checked before returning. On success the execution id is
    /// returned while the run continues in the background.
    pub async fn run_now(
        self: &Arc<Self>,
        job_id: Uuid,
        trigger: ExecutionTrigger,
    ) -> Result<Uuid, DispatchError> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or(DispatchError::JobNotFound(job_id))?;

        if let Verdict::Blocked(reason) = self.gate.check_job(&job).await? {
            warn!(%job_id, %reason, "Job dependencies not satisfied");
            return Err(DispatchError::DependenciesNotSatisfied(reason));
        }

        let execution = Execution::new(job.id, trigger);
        self.store.create_execution(&execution).await?;
        let execution_id = execution.id;
        info!(%job_id, %execution_id, %trigger, "Job run requested");

        let dispatcher = Arc::clone(self);
        self.tasks.spawn(async move {
            dispatcher.notify(&job, NotificationEvent::Start, None, None).await;
            if let Err(e) = dispatcher.execute(&job, execution).await {
                error!(%job_id, %execution_id, error = %e, "Job run failed");
            }
        });

        Ok(execution_id)
    }

    /// Kill a running execution and stop its retries.
    pub fn cancel(&self, execution_id: Uuid) -> bool {
        self.executor.cancel(&execution_id.to_string())
    }

    /// Wait for background runs and scheduled dispatches still in progress.
    pub async fn shutdown(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }

    /// Scheduled firing of `job_id`. Returns the execution id, if one ran.
    pub async fn run_scheduled(&self, job_id: Uuid) -> Result<Option<Uuid>, DispatchError> {
        let Some(job) = self.store.get_job(job_id).await? else {
            debug!(%job_id, "Fired job no longer exists");
            return Ok(None);
        };
        if !job.is_active {
            debug!(%job_id, "Fired job is inactive");
            return Ok(None);
        }

        if let Verdict::Blocked(reason) = self.gate.check_job(&job).await? {
            warn!(%job_id, %reason, "Job dependencies not satisfied");
            self.store.update_job_status(job_id, JobStatus::Failed).await?;
            let payload = json!({ "error": format!("Dependency not satisfied: {}", reason) });
            self.notify(&job, NotificationEvent::Failure, None, Some(&payload))
                .await;
            return Ok(None);
        }

        self.notify(&job, NotificationEvent::Start, None, None).await;

        let execution = Execution::new(job.id, ExecutionTrigger::Scheduled);
        self.store.create_execution(&execution).await?;
        let execution_id = execution.id;
        self.execute(&job, execution).await?;
        Ok(Some(execution_id))
    }

    /// Run the command with retries and record the outcome.
    async fn execute(
        &self,
        job: &Job,
        mut execution: Execution,
    ) -> Result<ExecutionResult, DispatchError> {
        execution.set_status(ExecutionStatus::Running);
        self.store.update_execution(&execution).await?;
        self.store.update_job_status(job.id, JobStatus::Running).await?;

        let result = self
            .executor
            .run_with_retry(
                &execution.id.to_string(),
                &job.command,
                Duration::from_secs(job.timeout_secs),
                job.max_retries,
                self.retry_delay,
            )
            .await;

        execution.apply_result(&result);
        self.store.update_execution(&execution).await?;

        let (job_status, event) = if result.is_success() {
            (JobStatus::Completed, NotificationEvent::Success)
        } else {
            (JobStatus::Failed, NotificationEvent::Failure)
        };
        self.store.update_job_status(job.id, job_status).await?;
        info!(
            job_id = %job.id,
            execution_id = %execution.id,
            status = %result.status,
            attempt = result.attempt_number,
            "Execution finished"
        );

        let payload = result.to_payload();
        self.notify(job, event, Some(execution.id), Some(&payload))
            .await;
        Ok(result)
    }

    /// Best-effort notification; failures never affect the job.
    async fn notify(
        &self,
        job: &Job,
        event: NotificationEvent,
        execution_id: Option<Uuid>,
        payload: Option<&Value>,
    ) {
        if let Err(e) = self
            .notifier
            .notify_event(job.owner_id, &job.name, event, Some(job.id), execution_id, payload)
            .await
        {
            error!(job_id = %job.id, %event, error = %e, "Failed to send notifications");
        }
    }
}

#[async_trait]
impl DispatchHandler for Dispatcher {
    async fn dispatch(&self, job_id: Uuid) {
        // Tracked so shutdown waits for the execution row to be finalized.
        if let Err(e) = self.tasks.track_future(self.run_scheduled(job_id)).await {
            error!(%job_id, error = %e, "Scheduled job execution failed");
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
