//! Job definition and status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for its next run.
    #[default]
    Pending,
    /// A dispatch is in flight.
    Running,
    /// Last run succeeded.
    Completed,
    /// Last run failed, timed out, or was blocked by a dependency.
    Failed,
    /// Cancelled by its owner.
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a schedule expression is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    /// Standard 5-field crontab expression.
    Cron,
    /// Fixed interval such as `30s`, `5m`, `1h`, `2d`.
    Interval,
}

impl std::fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleKind::Cron => f.write_str("cron"),
            ScheduleKind::Interval => f.write_str("interval"),
        }
    }
}

/// Schedule descriptor attached to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    pub kind: ScheduleKind,
    pub expression: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl ScheduleSpec {
    /// Cron schedule in UTC.
    pub fn cron(expression: impl Into<String>) -> Self {
        Self {
            kind: ScheduleKind::Cron,
            expression: expression.into(),
            timezone: default_timezone(),
        }
    }

    /// Interval schedule.
    pub fn interval(expression: impl Into<String>) -> Self {
        Self {
            kind: ScheduleKind::Interval,
            expression: expression.into(),
            timezone: default_timezone(),
        }
    }

    /// Set the timezone the expression is evaluated in.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }
}

/// A recurring job bound to a shell command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID.
    pub id: Uuid,
    /// Owning user.
    pub owner_id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Shell command to run.
    pub command: String,
    /// When the job fires.
    pub schedule: ScheduleSpec,
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
    /// Number of attempts per dispatch.
    pub max_retries: u32,
    /// Higher runs first when the store orders jobs.
    #[serde(default)]
    pub priority: i32,
    /// Inactive jobs are neither scheduled nor dispatchable.
    pub is_active: bool,
    /// Jobs that must have completed before this one may run, in order.
    /// Kept as raw strings so malformed references surface at the gate.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Current status.
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new active job with default timeout (300s) and retries (3).
    pub fn new(
        owner_id: Uuid,
        name: impl Into<String>,
        command: impl Into<String>,
        schedule: ScheduleSpec,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.into(),
            description: None,
            command: command.into(),
            schedule,
            timeout_secs: 300,
            max_retries: 3,
            priority: 0,
            is_active: true,
            dependencies: Vec::new(),
            status: JobStatus::Pending,
            tags: Vec::new(),
            metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the number of attempts per dispatch.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Append a dependency on another job.
    pub fn with_dependency(mut self, job_id: impl ToString) -> Self {
        self.dependencies.push(job_id.to_string());
        self
    }

    /// Set active state.
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    /// Update the status and touch `updated_at`.
    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
