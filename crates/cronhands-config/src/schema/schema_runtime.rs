//! Executor and scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Execution engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum number of commands running at once.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Per-attempt timeout for jobs created without one.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Attempts per dispatch for jobs created without a value.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause between attempts.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// First shell tokens that may run. Empty allows any command the denylist accepts.
    #[serde(default)]
    pub allowed_commands: Vec<String>,
}

impl ExecutorConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

fn default_max_workers() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    60
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            default_timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            allowed_commands: Vec::new(),
        }
    }
}

/// Trigger scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Timezone for jobs that do not name one.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// How often due times are checked.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// How late a firing may be and still run.
    #[serde(default = "default_misfire_grace_secs")]
    pub misfire_grace_secs: u64,
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn misfire_grace(&self) -> Duration {
        Duration::from_secs(self.misfire_grace_secs)
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_misfire_grace_secs() -> u64 {
    3600
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            tick_interval_ms: default_tick_interval_ms(),
            misfire_grace_secs: default_misfire_grace_secs(),
        }
    }
}
