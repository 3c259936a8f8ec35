//! Job management commands against the file store.

use std::sync::Arc;

use chrono::Utc;
use cronhands_config::Config;
use cronhands_core::{ExecutionStore, ExecutionTrigger, FileStore, Job, JobStore, ScheduleSpec};
use cronhands_executor::validate_command;
use cronhands_scheduler::Trigger;
use uuid::Uuid;

use crate::cli::{AddJobArgs, JobAction};
use crate::cmd_run::{build_dispatcher, store_path};

/// Longest per-attempt timeout a job may ask for.
const MAX_TIMEOUT_SECS: u64 = 86_400;
/// Most attempts a job may ask for per run.
const MAX_ATTEMPTS: u32 = 10;

pub async fn handle_job_command(
    action: JobAction,
    config: Config,
) -> Result<(), Box<dyn std::error::Error>> {
    if config.store.backend != "file" {
        return Err("job commands need the file store backend".into());
    }
    let store = Arc::new(FileStore::open(store_path(&config)).await?);

    match action {
        JobAction::Add(args) => add_job(&store, &config, args).await,
        JobAction::List => list_jobs(&store).await,
        JobAction::Remove { id } => {
            if store.delete_job(id).await? {
                println!("Removed job {}", id);
                Ok(())
            } else {
                Err(format!("Job not found: {}", id).into())
            }
        }
        JobAction::Run { id } => run_job(store, &config, id).await,
        JobAction::Deps { id } => {
            let dispatcher = build_dispatcher(store, &config)?;
            let report = dispatcher.dependency_report(id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn add_job(
    store: &FileStore,
    config: &Config,
    args: AddJobArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    validate_command(&args.command, &config.executor.allowed_commands)?;

    let mut schedule = match (args.cron, args.interval) {
        (Some(expression), _) => ScheduleSpec::cron(expression),
        (None, Some(expression)) => ScheduleSpec::interval(expression),
        (None, None) => return Err("either --cron or --interval is required".into()),
    };
    if let Some(timezone) = args.timezone {
        schedule = schedule.with_timezone(timezone);
    }
    let trigger = Trigger::from_spec(&schedule, &config.scheduler.timezone, Utc::now())?;

    let mut job = Job::new(
        args.owner.unwrap_or_default(),
        args.name,
        args.command,
        schedule,
    )
    .with_timeout(args.timeout.unwrap_or(config.executor.default_timeout_secs))
    .with_max_retries(args.retries.unwrap_or(config.executor.max_retries))
    .with_priority(args.priority)
    .with_active(!args.inactive);
    for dependency in args.depends_on {
        job = job.with_dependency(dependency);
    }

    check_new_job(&job, store).await?;
    store.save_job(&job).await?;
    println!("{}", job.id);
    if let Some(next) = trigger.next_fire_after(Utc::now()) {
        eprintln!("Next run: {}", next);
    }
    Ok(())
}

/// Reject limits a run can never satisfy and dependencies on unknown jobs.
async fn check_new_job(job: &Job, store: &dyn JobStore) -> Result<(), Box<dyn std::error::Error>> {
    if !(1..=MAX_TIMEOUT_SECS).contains(&job.timeout_secs) {
        return Err(format!(
            "timeout must be between 1 and {} seconds, got {}",
            MAX_TIMEOUT_SECS, job.timeout_secs
        )
        .into());
    }
    if !(1..=MAX_ATTEMPTS).contains(&job.max_retries) {
        return Err(format!(
            "retries must be between 1 and {}, got {}",
            MAX_ATTEMPTS, job.max_retries
        )
        .into());
    }
    for dependency in &job.dependencies {
        let id = Uuid::parse_str(dependency)
            .map_err(|_| format!("Invalid dependency ID format: {}", dependency))?;
        if store.get_job(id).await?.is_none() {
            return Err(format!("Dependency job not found: {}", dependency).into());
        }
    }
    Ok(())
}

async fn list_jobs(store: &FileStore) -> Result<(), Box<dyn std::error::Error>> {
    let jobs = store.list_jobs().await?;
    if jobs.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }

    println!(
        "{:<36} {:<20} {:<22} {:<10} {}",
        "ID", "NAME", "SCHEDULE", "STATUS", "ACTIVE"
    );
    println!("{}", "-".repeat(100));
    for job in jobs {
        let schedule = format!("{} {}", job.schedule.kind, job.schedule.expression);
        println!(
            "{:<36} {:<20} {:<22} {:<10} {}",
            job.id,
            job.name,
            schedule,
            job.status.as_str(),
            job.is_active
        );
    }
    Ok(())
}

async fn run_job(
    store: Arc<FileStore>,
    config: &Config,
    id: Uuid,
) -> Result<(), Box<dyn std::error::Error>> {
    let dispatcher = build_dispatcher(store.clone(), config)?;
    let execution_id = dispatcher.run_now(id, ExecutionTrigger::Manual).await?;
    eprintln!("Execution {} started", execution_id);
    dispatcher.shutdown().await;

    let Some(execution) = store.get_execution(execution_id).await? else {
        return Err(format!("Execution not found: {}", execution_id).into());
    };
    if let Some(stdout) = &execution.stdout {
        print!("{}", stdout);
    }
    if let Some(stderr) = &execution.stderr {
        eprint!("{}", stderr);
    }
    eprintln!(
        "Status: {} (attempt {})",
        execution.status, execution.attempt_number
    );
    match execution.error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cronhands_core::MemoryStore;

    fn job() -> Job {
        Job::new(Uuid::new_v4(), "nightly", "true", ScheduleSpec::interval("1h"))
            .with_timeout(60)
            .with_max_retries(3)
    }

    async fn rejection(job: &Job, store: &MemoryStore) -> String {
        check_new_job(job, store).await.unwrap_err().to_string()
    }

    #[tokio::test]
    async fn test_check_new_job_accepts_defaults() {
        let store = MemoryStore::new();
        assert!(check_new_job(&job(), &store).await.is_ok());
        let widest = job()
            .with_timeout(MAX_TIMEOUT_SECS)
            .with_max_retries(MAX_ATTEMPTS);
        assert!(check_new_job(&widest, &store).await.is_ok());
    }

    #[tokio::test]
    async fn test_check_new_job_rejects_out_of_range_limits() {
        let store = MemoryStore::new();
        assert_eq!(
            rejection(&job().with_timeout(0), &store).await,
            "timeout must be between 1 and 86400 seconds, got 0"
        );
        assert_eq!(
            rejection(&job().with_timeout(86_401), &store).await,
            "timeout must be between 1 and 86400 seconds, got 86401"
        );
        assert_eq!(
            rejection(&job().with_max_retries(0), &store).await,
            "retries must be between 1 and 10, got 0"
        );
        assert_eq!(
            rejection(&job().with_max_retries(11), &store).await,
            "retries must be between 1 and 10, got 11"
        );
    }

    #[tokio::test]
    async fn test_check_new_job_requires_existing_dependencies() {
        let store = MemoryStore::new();
        let upstream = job();
        store.save_job(&upstream).await.unwrap();

        let dependent = job().with_dependency(upstream.id);
        assert!(check_new_job(&dependent, &store).await.is_ok());

        let missing = Uuid::new_v4();
        assert_eq!(
            rejection(&job().with_dependency(missing), &store).await,
            format!("Dependency job not found: {}", missing)
        );
        assert_eq!(
            rejection(&job().with_dependency("nightly"), &store).await,
            "Invalid dependency ID format: nightly"
        );
    }
}
