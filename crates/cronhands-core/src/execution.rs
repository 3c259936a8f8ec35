//! Execution records and executor results.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Timeout,
    Cancelled,
}

impl ExecutionStatus {
    /// Whether the execution has reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed
                | ExecutionStatus::Failed
                | ExecutionStatus::Timeout
                | ExecutionStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Timeout => "timeout",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What started an execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionTrigger {
    #[default]
    Scheduled,
    Manual,
    Webhook,
}

impl std::fmt::Display for ExecutionTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionTrigger::Scheduled => f.write_str("scheduled"),
            ExecutionTrigger::Manual => f.write_str("manual"),
            ExecutionTrigger::Webhook => f.write_str("webhook"),
        }
    }
}

/// Outcome of running a command, as produced by the executor.
///
/// Execution failures are data, not errors: a nonzero exit, a timeout or a
/// spawn failure all come back as a result with the matching status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub return_code: Option<i32>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub duration: Duration,
    pub error: Option<String>,
    /// Which attempt produced this result (1-based, 0 when nothing ran).
    pub attempt_number: u32,
}

impl ExecutionResult {
    /// A failure where no process produced output.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            return_code: None,
            stdout: None,
            stderr: None,
            duration: Duration::ZERO,
            error: Some(error.into()),
            attempt_number: 0,
        }
    }

    /// The process was killed after running past its deadline.
    pub fn timed_out(duration: Duration, timeout: Duration) -> Self {
        Self {
            status: ExecutionStatus::Timeout,
            return_code: None,
            stdout: None,
            stderr: None,
            duration,
            error: Some(format!("Task timed out after {} seconds", timeout.as_secs())),
            attempt_number: 0,
        }
    }

    /// The process was killed on request.
    pub fn cancelled(duration: Duration) -> Self {
        Self {
            status: ExecutionStatus::Cancelled,
            return_code: None,
            stdout: None,
            stderr: None,
            duration,
            error: Some("Execution cancelled".to_string()),
            attempt_number: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    /// Free-form payload stored on the execution and handed to notifications.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "status": self.status,
            "return_code": self.return_code,
            "stdout": self.stdout,
            "stderr": self.stderr,
            "duration": self.duration.as_secs_f64(),
            "error": self.error,
            "attempt_number": self.attempt_number,
        })
    }
}

/// One dispatch of a job, covering every retry attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub trigger: ExecutionTrigger,
    pub start_time: Option<DateTime<Utc>>,
    /// Set if and only if the status is terminal.
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub return_code: Option<i32>,
    /// Attempt whose output is stored.
    pub attempt_number: u32,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Execution {
    /// Create a pending execution for a job.
    pub fn new(job_id: Uuid, trigger: ExecutionTrigger) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            status: ExecutionStatus::Pending,
            trigger,
            start_time: None,
            end_time: None,
            duration_ms: None,
            stdout: None,
            stderr: None,
            return_code: None,
            attempt_number: 1,
            result: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Move to a new status, keeping `end_time` consistent with it.
    pub fn set_status(&mut self, status: ExecutionStatus) {
        self.status = status;
        if status == ExecutionStatus::Running && self.start_time.is_none() {
            self.start_time = Some(Utc::now());
        }
        if status.is_terminal() {
            self.end_time.get_or_insert_with(Utc::now);
        } else {
            self.end_time = None;
        }
    }

    /// Record the executor's final result.
    pub fn apply_result(&mut self, result: &ExecutionResult) {
        self.stdout = result.stdout.clone();
        self.stderr = result.stderr.clone();
        self.return_code = result.return_code;
        self.duration_ms = Some(result.duration.as_millis() as u64);
        self.attempt_number = result.attempt_number.max(1);
        self.error = result.error.clone();
        self.result = result.return_code.map(|_| result.to_payload());
        self.set_status(result.status);
    }
}
