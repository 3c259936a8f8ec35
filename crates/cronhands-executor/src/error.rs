//! Command rejection reasons.

use thiserror::Error;

use crate::validator::MAX_COMMAND_LENGTH;

/// Why a command was refused before anything was spawned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Command cannot be empty")]
    Empty,

    #[error("Command too long (max {MAX_COMMAND_LENGTH} characters)")]
    TooLong,

    #[error("Command '{0}' not in allowed list")]
    NotAllowed(String),

    #[error("Command contains disallowed pattern: {0}")]
    DisallowedPattern(String),

    #[error("Command contains null bytes")]
    NullByte,

    #[error("Command contains too many newlines")]
    TooManyNewlines,
}
