//! # Cronhands Config
//!
//! TOML configuration for the cronhands daemon: schema with defaults for every
//! field, a loader that expands `${VAR}` references, and a validator that
//! reports errors and warnings separately.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
