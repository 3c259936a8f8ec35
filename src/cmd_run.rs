//! Scheduler daemon wiring.

use std::path::PathBuf;
use std::sync::Arc;

use cronhands_config::{Config, ConfigLoader};
use cronhands_core::{FileStore, MemoryStore, Store};
use cronhands_dispatch::Dispatcher;
use cronhands_executor::TaskExecutor;
use cronhands_notify::{Notifier, NotifyError};
use cronhands_scheduler::{SchedulerOptions, TriggerScheduler};
use tracing::{info, warn};

/// Resolved root of the file store.
pub fn store_path(config: &Config) -> PathBuf {
    ConfigLoader::expand_path(&config.store.path.to_string_lossy())
}

/// Executor, scheduler and notifier around `store`, joined by a dispatcher.
pub fn build_dispatcher<S: Store + 'static>(
    store: Arc<S>,
    config: &Config,
) -> Result<Arc<Dispatcher>, NotifyError> {
    let executor = Arc::new(TaskExecutor::new(
        config.executor.max_workers,
        config.executor.allowed_commands.clone(),
    ));
    let scheduler = Arc::new(TriggerScheduler::new(SchedulerOptions {
        tick_interval: config.scheduler.tick_interval(),
        misfire_grace: config.scheduler.misfire_grace(),
        default_timezone: config.scheduler.timezone.clone(),
    }));
    let notifier = Arc::new(Notifier::from_config(store.clone(), &config.notifications)?);

    Ok(Arc::new(Dispatcher::new(
        store,
        executor,
        scheduler,
        notifier,
        config.executor.retry_delay(),
    )))
}

/// Run the scheduler until Ctrl-C.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if config.store.backend == "memory" {
        warn!("Using the in-memory store; jobs are lost on exit");
        serve(Arc::new(MemoryStore::new()), &config).await
    } else {
        let path = store_path(&config);
        info!("Opening file store at {:?}", path);
        serve(Arc::new(FileStore::open(path).await?), &config).await
    }
}

async fn serve<S: Store + 'static>(
    store: Arc<S>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let dispatcher = build_dispatcher(store, config)?;
    let loaded = dispatcher.reload_schedules().await?;

    let scheduler = Arc::clone(dispatcher.scheduler());
    scheduler.start(dispatcher.clone())?;
    info!(
        "Cronhands started: {} jobs scheduled, {} workers",
        loaded,
        dispatcher.executor().max_workers()
    );
    for job in scheduler.list_active() {
        info!(job_id = %job.job_id, trigger = %job.trigger, next_fire_time = ?job.next_fire_time, "Active schedule");
    }

    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    scheduler.stop().await;
    dispatcher.shutdown().await;
    Ok(())
}
