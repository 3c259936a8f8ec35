//! Dependency gate: a job may run only when every job it depends on is
//! active and last completed successfully.

use std::sync::Arc;

use cronhands_core::{Job, JobStatus, JobStore, StoreError};
use serde::Serialize;
use uuid::Uuid;

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Satisfied,
    /// First failing dependency, described.
    Blocked(String),
}

impl Verdict {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Verdict::Satisfied)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Satisfied => None,
            Verdict::Blocked(reason) => Some(reason),
        }
    }
}

/// Current state of one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyStatus {
    pub job_id: Uuid,
    pub name: String,
    pub status: JobStatus,
    pub is_active: bool,
    pub completed: bool,
}

/// Dependency statuses together with the gate verdict.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyReport {
    pub job_id: Uuid,
    pub dependencies: Vec<DependencyStatus>,
    pub satisfied: bool,
    pub message: String,
}

pub struct DependencyGate {
    jobs: Arc<dyn JobStore>,
}

impl DependencyGate {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self { jobs }
    }

    /// Check the dependencies of a stored job. Unknown jobs pass.
    pub async fn check(&self, job_id: Uuid) -> Result<Verdict, StoreError> {
        match self.jobs.get_job(job_id).await? {
            Some(job) => self.check_job(&job).await,
            None => Ok(Verdict::Satisfied),
        }
    }

    /// Check `job`'s dependencies in order, stopping at the first failure.
    pub async fn check_job(&self, job: &Job) -> Result<Verdict, StoreError> {
        for raw in &job.dependencies {
            let Ok(dep_id) = Uuid::parse_str(raw) else {
                return Ok(Verdict::Blocked(format!(
                    "Invalid dependency ID format: {}",
                    raw
                )));
            };
            let Some(dep) = self.jobs.get_job(dep_id).await? else {
                return Ok(Verdict::Blocked(format!(
                    "Dependency job not found: {}",
                    raw
                )));
            };
            if !dep.is_active {
                return Ok(Verdict::Blocked(format!(
                    "Dependency '{}' is disabled",
                    dep.name
                )));
            }
            if dep.status != JobStatus::Completed {
                return Ok(Verdict::Blocked(format!(
                    "Dependency '{}' not completed (status: {})",
                    dep.name, dep.status
                )));
            }
        }
        Ok(Verdict::Satisfied)
    }

    /// Status of every resolvable dependency. Malformed or missing ids are left out.
    pub async fn status(&self, job_id: Uuid) -> Result<Vec<DependencyStatus>, StoreError> {
        let Some(job) = self.jobs.get_job(job_id).await? else {
            return Ok(Vec::new());
        };
        let ids: Vec<Uuid> = job
            .dependencies
            .iter()
            .filter_map(|raw| Uuid::parse_str(raw).ok())
            .collect();

        Ok(self
            .jobs
            .get_jobs(&ids)
            .await?
            .into_iter()
            .map(|dep| DependencyStatus {
                job_id: dep.id,
                completed: dep.status == JobStatus::Completed,
                name: dep.name,
                status: dep.status,
                is_active: dep.is_active,
            })
            .collect())
    }

    pub async fn report(&self, job_id: Uuid) -> Result<DependencyReport, StoreError> {
        let dependencies = self.status(job_id).await?;
        let verdict = self.check(job_id).await?;
        Ok(DependencyReport {
            job_id,
            dependencies,
            satisfied: verdict.is_satisfied(),
            message: verdict
                .reason()
                .unwrap_or("All dependencies satisfied")
                .to_string(),
        })
    }
}
