use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use kestrel_api::errors::{SystemError, SystemResult};

pub const DEFAULT_TICK_INTERVAL_US: u64 = 2500;
pub const DEFAULT_WATCHDOG_STEP_MS: u64 = 1000;
pub const DEFAULT_WATCHDOG_STEPS: u32 = 5;

/// Configuration for the scheduler thread pool.
///
/// Every field has a default, so a JSON document only needs the keys it
/// overrides:
///
/// ```rust
/// use kestrel::config::SchedulerConfig;
///
/// let config = SchedulerConfig::from_json_str(r#"{ "worker_count": 8 }"#).unwrap();
/// assert_eq!(config.worker_count, 8);
/// assert_eq!(config.watchdog_steps, 5);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of worker threads dispatching messages.
    pub worker_count: usize,

    /// Real time between two logical clock ticks, in microseconds.
    pub tick_interval_us: u64,

    /// Length of one watchdog sleep increment, in milliseconds. The live
    /// service count is re-checked after every increment.
    pub watchdog_step_ms: u64,

    /// Number of sleep increments between two stall checks.
    pub watchdog_steps: u32,

    /// Prefix for the names of all scheduler threads.
    pub thread_name_prefix: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            tick_interval_us: DEFAULT_TICK_INTERVAL_US,
            watchdog_step_ms: DEFAULT_WATCHDOG_STEP_MS,
            watchdog_steps: DEFAULT_WATCHDOG_STEPS,
            thread_name_prefix: "kestrel".to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Default configuration with an explicit worker count.
    pub fn with_workers(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Default::default()
        }
    }

    /// Parses a JSON document and validates the result.
    pub fn from_json_str(text: &str) -> SystemResult<Self> {
        let config: SchedulerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> SystemResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rejects values that would leave a role without a bounded loop.
    pub fn validate(&self) -> SystemResult<()> {
        if self.worker_count == 0 {
            return Err(SystemError::ConfigError(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if self.tick_interval_us == 0 {
            return Err(SystemError::ConfigError(
                "tick_interval_us must be greater than 0".to_string(),
            ));
        }
        if self.watchdog_step_ms == 0 || self.watchdog_steps == 0 {
            return Err(SystemError::ConfigError(
                "watchdog_step_ms and watchdog_steps must be greater than 0".to_string(),
            ));
        }
        // Shutdown must be observed within a second by every role
        if self.watchdog_step_ms > 1000 || self.tick_interval_us > 1_000_000 {
            return Err(SystemError::ConfigError(
                "watchdog_step_ms and tick_interval_us must not exceed one second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(self.tick_interval_us)
    }

    pub fn watchdog_step(&self) -> Duration {
        Duration::from_millis(self.watchdog_step_ms)
    }

    /// Time between two stall checks.
    pub fn watchdog_cycle(&self) -> Duration {
        self.watchdog_step() * self.watchdog_steps
    }
}
