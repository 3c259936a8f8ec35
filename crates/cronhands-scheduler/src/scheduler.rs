//! Trigger scheduler: tracks registrations and fires due jobs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use cronhands_core::ScheduleSpec;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::trigger::Trigger;

/// Receives due jobs. Called on a spawned task, never on the tick loop.
#[async_trait]
pub trait DispatchHandler: Send + Sync + 'static {
    async fn dispatch(&self, job_id: Uuid);
}

/// Tuning for the tick loop.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// How often due times are checked.
    pub tick_interval: Duration,
    /// How late a firing may be and still run.
    pub misfire_grace: Duration,
    /// Timezone for cron schedules that do not name one.
    pub default_timezone: String,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            misfire_grace: Duration::from_secs(3600),
            default_timezone: "UTC".to_string(),
        }
    }
}

/// Snapshot of one registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub job_id: Uuid,
    /// Human-readable trigger, e.g. `cron[0 9 * * 1-5 UTC]`.
    pub trigger: String,
    /// `None` once the schedule can never fire again.
    pub next_fire_time: Option<DateTime<Utc>>,
    pub paused: bool,
}

struct Registration {
    trigger: Trigger,
    next_fire_time: Option<DateTime<Utc>>,
    paused: bool,
}

impl Registration {
    fn snapshot(&self, job_id: Uuid) -> ScheduledJob {
        ScheduledJob {
            job_id,
            trigger: self.trigger.to_string(),
            next_fire_time: self.next_fire_time,
            paused: self.paused,
        }
    }
}

/// Clears the in-flight mark when a dispatch ends, even by panic.
struct InFlight {
    set: Arc<Mutex<HashSet<Uuid>>>,
    job_id: Uuid,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.set.lock().remove(&self.job_id);
    }
}

struct Runner {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns every job's trigger and next fire time.
pub struct TriggerScheduler {
    options: SchedulerOptions,
    registrations: Mutex<HashMap<Uuid, Registration>>,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
    handler: Mutex<Option<Arc<dyn DispatchHandler>>>,
    runner: Mutex<Option<Runner>>,
}

impl TriggerScheduler {
    pub fn new(options: SchedulerOptions) -> Self {
        Self {
            options,
            registrations: Mutex::new(HashMap::new()),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            handler: Mutex::new(None),
            runner: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Register a job, replacing any existing registration for the same id.
    ///
    /// Returns the first fire time. A malformed schedule leaves any previous
    /// registration untouched.
    pub fn add(
        &self,
        job_id: Uuid,
        spec: &ScheduleSpec,
    ) -> Result<Option<DateTime<Utc>>, ScheduleError> {
        self.add_at(job_id, spec, Utc::now())
    }

    fn add_at(
        &self,
        job_id: Uuid,
        spec: &ScheduleSpec,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, ScheduleError> {
        let trigger = Trigger::from_spec(spec, &self.options.default_timezone, now)?;
        let next_fire_time = trigger.next_fire_after(now);
        let description = trigger.to_string();

        let replaced = self
            .registrations
            .lock()
            .insert(
                job_id,
                Registration {
                    trigger,
                    next_fire_time,
                    paused: false,
                },
            )
            .is_some();

        if replaced {
            info!(%job_id, trigger = %description, ?next_fire_time, "Replaced job schedule");
        } else {
            info!(%job_id, trigger = %description, ?next_fire_time, "Scheduled job");
        }
        Ok(next_fire_time)
    }

    /// Drop a registration. Returns whether one existed.
    pub fn remove(&self, job_id: Uuid) -> bool {
        let removed = self.registrations.lock().remove(&job_id).is_some();
        if removed {
            info!(%job_id, "Unscheduled job");
        }
        removed
    }

    /// Stop firing a job without forgetting its trigger.
    pub fn pause(&self, job_id: Uuid) -> Result<(), ScheduleError> {
        let mut registrations = self.registrations.lock();
        let registration = registrations
            .get_mut(&job_id)
            .ok_or(ScheduleError::NotScheduled(job_id))?;
        registration.paused = true;
        info!(%job_id, "Paused job");
        Ok(())
    }

    /// Continue firing a paused job from now on. Returns the next fire time.
    pub fn resume(&self, job_id: Uuid) -> Result<Option<DateTime<Utc>>, ScheduleError> {
        self.resume_at(job_id, Utc::now())
    }

    fn resume_at(
        &self,
        job_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, ScheduleError> {
        let mut registrations = self.registrations.lock();
        let registration = registrations
            .get_mut(&job_id)
            .ok_or(ScheduleError::NotScheduled(job_id))?;
        registration.paused = false;
        registration.next_fire_time = registration.trigger.next_fire_after(now);
        info!(%job_id, next_fire_time = ?registration.next_fire_time, "Resumed job");
        Ok(registration.next_fire_time)
    }

    /// Unpaused registrations that will fire again, soonest first.
    pub fn list_active(&self) -> Vec<ScheduledJob> {
        let mut active: Vec<ScheduledJob> = self
            .registrations
            .lock()
            .iter()
            .filter(|(_, r)| !r.paused && r.next_fire_time.is_some())
            .map(|(id, r)| r.snapshot(*id))
            .collect();
        active.sort_by_key(|job| job.next_fire_time);
        active
    }

    pub fn get(&self, job_id: Uuid) -> Option<ScheduledJob> {
        self.registrations
            .lock()
            .get(&job_id)
            .map(|r| r.snapshot(job_id))
    }

    pub fn len(&self) -> usize {
        self.registrations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.lock().is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.runner.lock().is_some()
    }

    /// Whether a dispatch for `job_id` has not returned yet.
    pub fn is_dispatching(&self, job_id: Uuid) -> bool {
        self.in_flight.lock().contains(&job_id)
    }

    /// Start the tick loop, sending due jobs to `handler`.
    pub fn start(self: &Arc<Self>, handler: Arc<dyn DispatchHandler>) -> Result<(), ScheduleError> {
        let mut runner = self.runner.lock();
        if runner.is_some() {
            return Err(ScheduleError::AlreadyRunning);
        }
        *self.handler.lock() = Some(handler);

        let cancel = CancellationToken::new();
        let scheduler = Arc::clone(self);
        let token = cancel.clone();
        let handle = tokio::spawn(async move { scheduler.run(token).await });

        *runner = Some(Runner { cancel, handle });
        Ok(())
    }

    /// Stop the tick loop. In-flight dispatches keep running.
    pub async fn stop(&self) {
        let runner = self.runner.lock().take();
        if let Some(runner) = runner {
            runner.cancel.cancel();
            if let Err(e) = runner.handle.await {
                error!("Scheduler loop ended abnormally: {}", e);
            }
        }
        self.handler.lock().take();
    }

    async fn run(&self, cancel: CancellationToken) {
        info!(
            "Trigger scheduler started (tick interval: {:?}, misfire grace: {:?})",
            self.options.tick_interval, self.options.misfire_grace
        );

        let mut interval = tokio::time::interval(self.options.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.fire_due(Utc::now());
                }
                _ = cancel.cancelled() => {
                    info!("Trigger scheduler shutting down");
                    break;
                }
            }
        }
    }

    /// One scheduling pass at `now`. Returns the number of dispatches started.
    pub fn fire_due(&self, now: DateTime<Utc>) -> usize {
        let Some(handler) = self.handler.lock().clone() else {
            return 0;
        };

        let due = self.collect_due(now);
        let mut fired = 0;
        for job_id in due {
            if !self.in_flight.lock().insert(job_id) {
                debug!(%job_id, "Previous dispatch still running, skipping firing");
                continue;
            }
            let guard = InFlight {
                set: Arc::clone(&self.in_flight),
                job_id,
            };
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let _guard = guard;
                handler.dispatch(job_id).await;
            });
            fired += 1;
        }
        fired
    }

    /// Advance every due registration and return the ids that should fire.
    fn collect_due(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        let grace = TimeDelta::from_std(self.options.misfire_grace)
            .unwrap_or_else(|_| TimeDelta::days(365 * 100));
        let mut due = Vec::new();

        let mut registrations = self.registrations.lock();
        for (job_id, registration) in registrations.iter_mut() {
            if registration.paused {
                continue;
            }
            let Some(scheduled) = registration.next_fire_time else {
                continue;
            };
            if scheduled > now {
                continue;
            }

            // A long stall leaves `scheduled` at the oldest missed slot; any
            // slot inside the window is enough to fire once.
            let in_window = match now.checked_sub_signed(grace) {
                Some(window_start) => {
                    scheduled >= window_start
                        || registration.trigger.fires_between(window_start, now)
                }
                None => true,
            };
            if in_window {
                due.push(*job_id);
            } else {
                let late_by = now - scheduled;
                warn!(
                    %job_id,
                    %scheduled,
                    late_by_secs = late_by.num_seconds(),
                    "Missed firing outside grace window, dropping"
                );
            }

            registration.next_fire_time = registration.trigger.next_fire_after(now);
            if registration.next_fire_time.is_none() {
                info!(%job_id, "Schedule has no further firings");
            }
        }
        due
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
