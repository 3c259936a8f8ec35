use super::*;
use crate::output::{MAX_OUTPUT_BYTES, TRUNCATION_MARKER};
use std::sync::Arc;
use tempfile::TempDir;

fn executor() -> TaskExecutor {
    TaskExecutor::new(4, Vec::new())
}

async fn wait_until_running(executor: &TaskExecutor, key: &str) {
    for _ in 0..200 {
        if executor.is_running(key) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{key} never started");
}

#[tokio::test]
async fn test_run_echo() {
    let result = executor()
        .run("echo", "echo hello", Duration::from_secs(5))
        .await;
    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.return_code, Some(0));
    assert_eq!(result.stdout.as_deref(), Some("hello\n"));
    assert!(result.stderr.is_none());
    assert!(result.error.is_none());
    assert_eq!(result.attempt_number, 1);
}

#[tokio::test]
async fn test_run_exit_code() {
    let result = executor().run("fail", "exit 1", Duration::from_secs(5)).await;
    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.return_code, Some(1));
    assert_eq!(result.error.as_deref(), Some("Exit code: 1"));
}

#[tokio::test]
async fn test_run_captures_stderr() {
    let result = executor()
        .run("stderr", "echo oops >&2", Duration::from_secs(5))
        .await;
    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.stderr.as_deref(), Some("oops\n"));
    assert!(result.stdout.is_none());
}

#[tokio::test]
async fn test_run_timeout() {
    let timeout = Duration::from_millis(200);
    let executor = executor();
    let result = executor.run("slow", "sleep 5", timeout).await;

    assert_eq!(result.status, ExecutionStatus::Timeout);
    assert!(result.return_code.is_none());
    assert!(result.stdout.is_none());
    assert!(result.duration >= timeout);
    assert!(result.duration < Duration::from_secs(5));
    assert!(!executor.is_running("slow"));
    assert_eq!(executor.running_count(), 0);
}

#[tokio::test]
async fn test_run_truncates_output() {
    let result = executor()
        .run(
            "big",
            "head -c 200000 /dev/zero | tr '\\0' 'a'",
            Duration::from_secs(10),
        )
        .await;
    assert_eq!(result.status, ExecutionStatus::Completed);
    let stdout = result.stdout.unwrap();
    assert_eq!(stdout.len(), MAX_OUTPUT_BYTES + TRUNCATION_MARKER.len());
    assert!(stdout.ends_with(TRUNCATION_MARKER));
    assert!(stdout[..MAX_OUTPUT_BYTES].bytes().all(|b| b == b'a'));
}

#[tokio::test]
async fn test_run_rejects_denylisted_command() {
    let executor = executor();
    let result = executor
        .run("bad", "echo hi; rm -rf /tmp/nothing", Duration::from_secs(5))
        .await;
    assert_eq!(result.status, ExecutionStatus::Failed);
    assert!(result.return_code.is_none());
    assert!(
        result
            .error
            .as_deref()
            .unwrap()
            .starts_with("Command validation failed: Command contains disallowed pattern")
    );
    assert_eq!(result.duration, Duration::ZERO);
    assert_eq!(executor.running_count(), 0);
}

#[tokio::test]
async fn test_run_respects_allowlist() {
    let executor = TaskExecutor::new(1, vec!["echo".to_string()]);
    let ok = executor.run("a", "echo fine", Duration::from_secs(5)).await;
    assert!(ok.is_success());

    let denied = executor.run("b", "ls /", Duration::from_secs(5)).await;
    assert_eq!(
        denied.error.as_deref(),
        Some("Command validation failed: Command 'ls' not in allowed list")
    );
}

#[tokio::test]
async fn test_retry_exhausts_attempts() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("attempts");
    let command = format!("echo x >> {}; exit 1", marker.display());

    let result = executor()
        .run_with_retry("retry", &command, Duration::from_secs(5), 3, Duration::from_millis(10))
        .await;

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.attempt_number, 3);
    assert_eq!(result.return_code, Some(1));
    let attempts = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(attempts.lines().count(), 3);
}

#[tokio::test]
async fn test_retry_stops_on_success() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("attempts");
    let command = format!("echo x >> {}", marker.display());

    let result = executor()
        .run_with_retry("once", &command, Duration::from_secs(5), 3, Duration::from_millis(10))
        .await;

    assert!(result.is_success());
    assert_eq!(result.attempt_number, 1);
    let attempts = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(attempts.lines().count(), 1);
}

#[tokio::test]
async fn test_retry_succeeds_on_second_attempt() {
    let dir = TempDir::new().unwrap();
    let flag = dir.path().join("flag");
    let command = format!(
        "if [ -e {0} ]; then exit 0; else touch {0}; exit 1; fi",
        flag.display()
    );

    let result = executor()
        .run_with_retry("flaky", &command, Duration::from_secs(5), 3, Duration::from_millis(10))
        .await;

    assert!(result.is_success());
    assert_eq!(result.attempt_number, 2);
}

#[tokio::test]
async fn test_retry_validation_failure_spawns_nothing() {
    let executor = executor();
    let result = executor
        .run_with_retry("bad", "echo `id`", Duration::from_secs(5), 3, Duration::from_secs(60))
        .await;
    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.attempt_number, 0);
    assert!(!executor.is_running("bad"));
}

#[tokio::test]
async fn test_retry_zero_attempts() {
    let result = executor()
        .run_with_retry("none", "echo hi", Duration::from_secs(5), 0, Duration::ZERO)
        .await;
    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.error.as_deref(), Some("No execution result available"));
    assert_eq!(result.attempt_number, 0);
}

#[tokio::test]
async fn test_cancel_running_process() {
    let executor = Arc::new(executor());
    let handle = {
        let executor = executor.clone();
        tokio::spawn(async move {
            executor
                .run("long", "sleep 30", Duration::from_secs(60))
                .await
        })
    };

    wait_until_running(&executor, "long").await;
    assert_eq!(executor.running_count(), 1);
    assert!(executor.cancel("long"));

    let result = handle.await.unwrap();
    assert_eq!(result.status, ExecutionStatus::Cancelled);
    assert!(result.duration < Duration::from_secs(30));
    assert!(!executor.is_running("long"));
    assert!(!executor.cancel("long"));
}

#[tokio::test]
async fn test_cancel_retry_sequence_during_backoff() {
    let executor = Arc::new(executor());
    let handle = {
        let executor = executor.clone();
        tokio::spawn(async move {
            executor
                .run_with_retry("seq", "exit 1", Duration::from_secs(5), 3, Duration::from_secs(30))
                .await
        })
    };

    wait_until_running(&executor, "seq").await;
    // Let the first attempt fail and enter the backoff.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(executor.running_count(), 0);
    assert!(executor.cancel("seq"));

    let result = handle.await.unwrap();
    assert_eq!(result.status, ExecutionStatus::Cancelled);
    assert_eq!(result.attempt_number, 1);
}

#[tokio::test]
async fn test_retry_backoff_releases_worker_slot() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("attempted");
    let command = format!("touch {}; exit 1", marker.display());
    let executor = Arc::new(TaskExecutor::new(1, Vec::new()));

    let retrying = {
        let executor = executor.clone();
        tokio::spawn(async move {
            executor
                .run_with_retry("seq", &command, Duration::from_secs(5), 3, Duration::from_secs(2))
                .await
        })
    };

    for _ in 0..200 {
        if marker.exists() && executor.available_slots() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(executor.available_slots(), 1);

    // The only slot is free while the sequence sleeps between attempts.
    let other = tokio::time::timeout(
        Duration::from_secs(1),
        executor.run("other", "echo ok", Duration::from_secs(5)),
    )
    .await
    .expect("run blocked behind a retry backoff");
    assert!(other.is_success());
    assert!(!retrying.is_finished());

    assert!(executor.cancel("seq"));
    assert_eq!(retrying.await.unwrap().status, ExecutionStatus::Cancelled);
}

#[tokio::test]
async fn test_retry_sleeps_between_attempts() {
    let delay = Duration::from_millis(200);
    let started = Instant::now();

    let result = executor()
        .run_with_retry("slow", "exit 1", Duration::from_secs(5), 3, delay)
        .await;

    assert_eq!(result.attempt_number, 3);
    assert!(started.elapsed() >= delay * 2);
}

#[tokio::test]
async fn test_cancel_unknown_key() {
    assert!(!executor().cancel("missing"));
}

#[tokio::test]
async fn test_worker_limit_serializes() {
    let executor = Arc::new(TaskExecutor::new(1, Vec::new()));
    let started = Instant::now();

    let a = {
        let executor = executor.clone();
        tokio::spawn(async move { executor.run("a", "sleep 0.3", Duration::from_secs(5)).await })
    };
    let b = {
        let executor = executor.clone();
        tokio::spawn(async move { executor.run("b", "sleep 0.3", Duration::from_secs(5)).await })
    };

    assert!(a.await.unwrap().is_success());
    assert!(b.await.unwrap().is_success());
    assert!(started.elapsed() >= Duration::from_millis(600));
    assert_eq!(executor.available_slots(), 1);
}

#[test]
fn test_zero_workers_clamped() {
    let executor = TaskExecutor::new(0, Vec::new());
    assert_eq!(executor.max_workers(), 1);
}
