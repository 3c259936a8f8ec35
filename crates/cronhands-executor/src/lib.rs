//! # Cronhands Executor
//!
//! Runs job commands through the system shell:
//!
//! - [`validate_command`] and [`sanitize_command`] gate raw command strings
//! - [`TaskExecutor`] bounds concurrency with a worker pool, enforces
//!   per-attempt timeouts, captures output and retries failed attempts
//!
//! Failures of the command itself (nonzero exit, timeout, spawn error) come
//! back as an [`ExecutionResult`](cronhands_core::ExecutionResult), never as an
//! `Err`.

mod engine;
mod error;
mod output;
mod validator;

pub use engine::TaskExecutor;
pub use error::CommandError;
pub use output::{MAX_CAPTURE_BYTES, MAX_OUTPUT_BYTES, TRUNCATION_MARKER, truncate_output};
pub use validator::{MAX_COMMAND_LENGTH, sanitize_command, validate_command};
