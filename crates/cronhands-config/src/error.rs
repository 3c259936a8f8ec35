//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration file at {}", .0.display())]
    NotFound(PathBuf),

    /// First validation error, as `section.field`.
    #[error("{field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Config references ${{{0}}}, which is not set")]
    EnvVarNotSet(String),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config: {0}")]
    TomlParse(#[from] toml::de::Error),
}
