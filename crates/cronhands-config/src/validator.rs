//! Configuration validation.

use chrono_tz::Tz;

use crate::error::ConfigError;
use crate::schema::{Config, STORE_BACKENDS};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn the first error into a `ConfigError`.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_store(config, &mut result);
        Self::validate_executor(config, &mut result);
        Self::validate_scheduler(config, &mut result);
        Self::validate_notifications(config, &mut result);

        result
    }

    fn validate_store(config: &Config, result: &mut ValidationResult) {
        if !STORE_BACKENDS.contains(&config.store.backend.as_str()) {
            result.add_error(ValidationError::new(
                "store.backend",
                format!(
                    "Unknown backend '{}', expected one of: {}",
                    config.store.backend,
                    STORE_BACKENDS.join(", ")
                ),
            ));
        }

        if config.store.backend == "memory" {
            result.add_warning(ValidationWarning::new(
                "store.backend",
                "Memory store loses all jobs on restart",
            ));
        }
    }

    fn validate_executor(config: &Config, result: &mut ValidationResult) {
        let executor = &config.executor;

        if executor.max_workers == 0 {
            result.add_error(ValidationError::new(
                "executor.max_workers",
                "max_workers must be greater than 0",
            ));
        }

        if executor.default_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "executor.default_timeout_secs",
                "default_timeout_secs must be greater than 0",
            ));
        }

        if executor.max_retries == 0 {
            result.add_warning(ValidationWarning::new(
                "executor.max_retries",
                "max_retries is 0, jobs created without a retry count will never run",
            ));
        }

        if executor.allowed_commands.iter().any(|c| c.trim().is_empty()) {
            result.add_error(ValidationError::new(
                "executor.allowed_commands",
                "allowed_commands cannot contain empty entries",
            ));
        }
    }

    fn validate_scheduler(config: &Config, result: &mut ValidationResult) {
        let scheduler = &config.scheduler;

        if scheduler.tick_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "scheduler.tick_interval_ms",
                "tick_interval_ms must be greater than 0",
            ));
        }

        if scheduler.timezone.parse::<Tz>().is_err() {
            result.add_error(ValidationError::new(
                "scheduler.timezone",
                format!("Unknown timezone '{}'", scheduler.timezone),
            ));
        }
    }

    fn validate_notifications(config: &Config, result: &mut ValidationResult) {
        let notifications = &config.notifications;

        if !notifications.email.is_configured() {
            result.add_warning(ValidationWarning::new(
                "notifications.email.smtp_host",
                "SMTP host is not set, email notifications will fail",
            ));
        } else if notifications.email.sender().is_empty() {
            result.add_error(ValidationError::new(
                "notifications.email.from",
                "Sender address is required when SMTP is configured",
            ));
        }

        if !notifications.sms.is_configured() {
            result.add_warning(ValidationWarning::new(
                "notifications.sms",
                "SMS credentials are incomplete, SMS notifications will fail",
            ));
        }

        let api_base = &notifications.sms.api_base;
        if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
            result.add_error(ValidationError::new(
                "notifications.sms.api_base",
                "api_base must start with http:// or https://",
            ));
        }

        if notifications.webhook.timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "notifications.webhook.timeout_secs",
                "timeout_secs must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
