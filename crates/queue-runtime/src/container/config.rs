//! # Runtime Configuration
//!
//! Defaults overridden by `CQ_*` environment variables.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `CQ_GRACE_PERIOD_MINUTES` | `queue.default_grace_period_minutes` |
//! | `CQ_REOPEN_WINDOW_SECS` | `queue.reopen_window_secs` |
//! | `CQ_LOCK_TIMEOUT_MS` | `queue.lock_timeout_ms` |
//! | `CQ_WAIT_AVERAGE_WINDOW` | `queue.wait_average_window` |
//! | `CQ_SCHEDULER_TICK_MS` | `scheduler.tick_interval_ms` |
//! | `CQ_SWEEP_EVERY_TICKS` | `scheduler.sweep_every_ticks` |
//! | `CQ_LOG_LEVEL` | `log_level` (an `EnvFilter` directive) |
//!
//! Values that do not parse are logged and ignored.

use queue_engine::{QueueConfig, SchedulerConfig};
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid queue settings: {0}")]
    Queue(queue_engine::ConfigError),
    #[error("invalid scheduler settings: {0}")]
    Scheduler(queue_engine::ConfigError),
    #[error("log level must not be empty")]
    EmptyLogLevel,
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub queue: QueueConfig,
    pub scheduler: SchedulerConfig,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            scheduler: SchedulerConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup (the environment, or a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let queue = &mut config.queue;
        override_from(&lookup, "CQ_GRACE_PERIOD_MINUTES", &mut queue.default_grace_period_minutes);
        override_from(&lookup, "CQ_REOPEN_WINDOW_SECS", &mut queue.reopen_window_secs);
        override_from(&lookup, "CQ_LOCK_TIMEOUT_MS", &mut queue.lock_timeout_ms);
        override_from(&lookup, "CQ_WAIT_AVERAGE_WINDOW", &mut queue.wait_average_window);

        let scheduler = &mut config.scheduler;
        override_from(&lookup, "CQ_SCHEDULER_TICK_MS", &mut scheduler.tick_interval_ms);
        override_from(&lookup, "CQ_SWEEP_EVERY_TICKS", &mut scheduler.sweep_every_ticks);

        if let Some(level) = lookup("CQ_LOG_LEVEL") {
            config.log_level = level.trim().to_string();
        }
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.queue.validate().map_err(ConfigError::Queue)?;
        self.scheduler.validate().map_err(ConfigError::Scheduler)?;
        if self.log_level.is_empty() {
            return Err(ConfigError::EmptyLogLevel);
        }
        Ok(())
    }
}

fn override_from<F, V>(lookup: &F, key: &str, target: &mut V)
where
    F: Fn(&str) -> Option<String>,
    V: FromStr,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => warn!(key, value = %raw, "Ignoring unparseable setting"),
    }
}
