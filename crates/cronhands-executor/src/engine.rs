//! Bounded shell execution with timeout, cancellation and retry.

use std::collections::HashMap;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use cronhands_core::{ExecutionResult, ExecutionStatus};
use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::output::{decode_output, read_capped};
use crate::validator::{sanitize_command, validate_command};

/// In-flight work, keyed by execution key.
#[derive(Default)]
struct Tracker {
    /// One entry per spawned (or slot-waiting) process.
    processes: HashMap<String, CancellationToken>,
    /// One entry per retry sequence; cancelling it cancels every attempt.
    sequences: HashMap<String, CancellationToken>,
}

#[derive(Clone, Copy)]
enum TrackKind {
    Process,
    Sequence,
}

/// Removes its tracker entry on drop, whichever way the run ends.
struct Tracked<'a> {
    tracker: &'a Mutex<Tracker>,
    key: String,
    kind: TrackKind,
}

impl Drop for Tracked<'_> {
    fn drop(&mut self) {
        let mut tracker = self.tracker.lock();
        match self.kind {
            TrackKind::Process => tracker.processes.remove(&self.key),
            TrackKind::Sequence => tracker.sequences.remove(&self.key),
        };
    }
}

enum Outcome {
    Finished(std::io::Result<(ExitStatus, Vec<u8>, Vec<u8>)>),
    TimedOut,
    Cancelled,
}

/// Runs job commands on a fixed-size worker pool.
pub struct TaskExecutor {
    semaphore: Semaphore,
    max_workers: usize,
    allowed_commands: Vec<String>,
    tracker: Mutex<Tracker>,
}

impl TaskExecutor {
    /// Create an executor allowing `max_workers` concurrent processes.
    ///
    /// An empty `allowed_commands` list permits any first word.
    pub fn new(max_workers: usize, allowed_commands: Vec<String>) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            semaphore: Semaphore::new(max_workers),
            max_workers,
            allowed_commands,
            tracker: Mutex::new(Tracker::default()),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Worker slots not currently held.
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Validate and run a command once.
    pub async fn run(&self, key: &str, command: &str, timeout: Duration) -> ExecutionResult {
        let command = match self.prepare(key, command) {
            Ok(command) => command,
            Err(result) => return result,
        };
        let mut result = self
            .attempt(key, &command, timeout, CancellationToken::new())
            .await;
        result.attempt_number = 1;
        result
    }

    /// Validate once, then run up to `max_retries` attempts.
    ///
    /// Stops at the first completed attempt. Failed and timed-out attempts
    /// are followed by `retry_delay`, during which no worker slot is held.
    /// A cancelled attempt ends the sequence.
    pub async fn run_with_retry(
        &self,
        key: &str,
        command: &str,
        timeout: Duration,
        max_retries: u32,
        retry_delay: Duration,
    ) -> ExecutionResult {
        let command = match self.prepare(key, command) {
            Ok(command) => command,
            Err(result) => return result,
        };

        let sequence = CancellationToken::new();
        let _tracked = self.track(key, sequence.clone(), TrackKind::Sequence);
        let mut last: Option<ExecutionResult> = None;

        for attempt in 1..=max_retries {
            info!(key, attempt, max_retries, "Executing attempt");
            let attempt_key = format!("{}_attempt_{}", key, attempt);
            let mut result = self
                .attempt(&attempt_key, &command, timeout, sequence.child_token())
                .await;
            result.attempt_number = attempt;

            match result.status {
                ExecutionStatus::Completed => {
                    info!(key, attempt, "Attempt completed");
                    return result;
                }
                ExecutionStatus::Cancelled => {
                    info!(key, attempt, "Retry sequence cancelled");
                    return result;
                }
                _ => {
                    warn!(
                        key,
                        attempt,
                        status = %result.status,
                        error = result.error.as_deref().unwrap_or(""),
                        "Attempt failed"
                    );
                }
            }

            let more = attempt < max_retries;
            let duration = result.duration;
            last = Some(result);

            if more {
                tokio::select! {
                    _ = tokio::time::sleep(retry_delay) => {}
                    _ = sequence.cancelled() => {
                        info!(key, attempt, "Retry sequence cancelled during backoff");
                        let mut cancelled = ExecutionResult::cancelled(duration);
                        cancelled.attempt_number = attempt;
                        return cancelled;
                    }
                }
            }
        }

        match last {
            Some(result) => {
                error!(key, attempts = max_retries, "All attempts failed");
                result
            }
            None => ExecutionResult::failed("No execution result available"),
        }
    }

    /// Kill the process (or every attempt of the retry sequence) tracked under `key`.
    pub fn cancel(&self, key: &str) -> bool {
        let token = {
            let mut tracker = self.tracker.lock();
            tracker
                .processes
                .remove(key)
                .or_else(|| tracker.sequences.remove(key))
        };
        match token {
            Some(token) => {
                token.cancel();
                info!(key, "Execution cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, key: &str) -> bool {
        let tracker = self.tracker.lock();
        tracker.processes.contains_key(key) || tracker.sequences.contains_key(key)
    }

    /// Number of tracked processes, including those waiting for a slot.
    pub fn running_count(&self) -> usize {
        self.tracker.lock().processes.len()
    }

    fn prepare(&self, key: &str, command: &str) -> Result<String, ExecutionResult> {
        match validate_command(command, &self.allowed_commands) {
            Ok(()) => Ok(sanitize_command(command)),
            Err(reason) => {
                let preview: String = command.chars().take(100).collect();
                warn!(key, command = %preview, %reason, "Command validation failed");
                Err(ExecutionResult::failed(format!(
                    "Command validation failed: {}",
                    reason
                )))
            }
        }
    }

    fn track(&self, key: &str, token: CancellationToken, kind: TrackKind) -> Tracked<'_> {
        let mut tracker = self.tracker.lock();
        match kind {
            TrackKind::Process => tracker.processes.insert(key.to_string(), token),
            TrackKind::Sequence => tracker.sequences.insert(key.to_string(), token),
        };
        Tracked {
            tracker: &self.tracker,
            key: key.to_string(),
            kind,
        }
    }

    /// One attempt: wait for a slot, spawn, race completion against the
    /// deadline and the cancel token.
    async fn attempt(
        &self,
        key: &str,
        command: &str,
        timeout: Duration,
        token: CancellationToken,
    ) -> ExecutionResult {
        let _tracked = self.track(key, token.clone(), TrackKind::Process);

        let _permit = tokio::select! {
            permit = self.semaphore.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => return ExecutionResult::failed("Executor is shut down"),
            },
            _ = token.cancelled() => return ExecutionResult::cancelled(Duration::ZERO),
        };

        let started = Instant::now();
        let mut child = match shell(command).spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(key, error = %e, "Failed to spawn command");
                let mut result = ExecutionResult::failed(format!("Failed to spawn command: {}", e));
                result.duration = started.elapsed();
                return result;
            }
        };
        debug!(key, pid = ?child.id(), "Spawned command");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let outcome = tokio::select! {
            finished = async {
                let (status, out, err) =
                    tokio::join!(child.wait(), read_capped(stdout), read_capped(stderr));
                Ok::<_, std::io::Error>((status?, out?, err?))
            } => Outcome::Finished(finished),
            _ = tokio::time::sleep(timeout) => Outcome::TimedOut,
            _ = token.cancelled() => Outcome::Cancelled,
        };

        match outcome {
            Outcome::Finished(Ok((status, out, err))) => {
                let code = exit_code(status);
                let duration = started.elapsed();
                let success = code == 0;
                debug!(key, code, ?duration, "Command finished");
                ExecutionResult {
                    status: if success {
                        ExecutionStatus::Completed
                    } else {
                        ExecutionStatus::Failed
                    },
                    return_code: Some(code),
                    stdout: decode_output(&out),
                    stderr: decode_output(&err),
                    duration,
                    error: (!success).then(|| format!("Exit code: {}", code)),
                    attempt_number: 0,
                }
            }
            Outcome::Finished(Err(e)) => {
                terminate(key, &mut child).await;
                let mut result = ExecutionResult::failed(e.to_string());
                result.duration = started.elapsed();
                result
            }
            Outcome::TimedOut => {
                warn!(key, timeout_secs = timeout.as_secs(), "Command timed out");
                terminate(key, &mut child).await;
                ExecutionResult::timed_out(started.elapsed(), timeout)
            }
            Outcome::Cancelled => {
                terminate(key, &mut child).await;
                ExecutionResult::cancelled(started.elapsed())
            }
        }
    }
}

fn shell(command: &str) -> Command {
    let (shell, flag) = if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    };

    let mut cmd = Command::new(shell);
    cmd.arg(flag)
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Force-kill and reap.
async fn terminate(key: &str, child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!(key, error = %e, "Kill failed, process already gone");
    }
}

/// Exit code, or the negated signal number when killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    status.code().unwrap_or(-1)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
