//! Engine configuration.

use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Longest accepted reopen window (one day).
pub const MAX_REOPEN_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Invalid configuration value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: u64 },
}

/// Queue behavior settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Grace period applied when `markAbsent` does not name one.
    pub default_grace_period_minutes: u32,
    /// How long a day closure can be reversed.
    pub reopen_window_secs: u64,
    /// Bounded wait for the clinic-day writer lock (milliseconds).
    pub lock_timeout_ms: u64,
    /// Number of recent consultations in the average wait.
    pub wait_average_window: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_grace_period_minutes: 10,
            reopen_window_secs: 300, // 5 minutes
            lock_timeout_ms: 2_000,
            wait_average_window: 10,
        }
    }
}

impl QueueConfig {
    /// Short timeouts for tests.
    pub fn for_testing() -> Self {
        Self {
            lock_timeout_ms: 200,
            ..Default::default()
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Clamped to [`MAX_REOPEN_WINDOW_SECS`].
    pub fn reopen_window(&self) -> ChronoDuration {
        let secs = self.reopen_window_secs.min(MAX_REOPEN_WINDOW_SECS);
        ChronoDuration::seconds(i64::try_from(secs).unwrap_or_default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_grace_period_minutes == 0 {
            return Err(ConfigError::Zero {
                field: "default_grace_period_minutes",
            });
        }
        if self.reopen_window_secs == 0 {
            return Err(ConfigError::Zero {
                field: "reopen_window_secs",
            });
        }
        if self.reopen_window_secs > MAX_REOPEN_WINDOW_SECS {
            return Err(ConfigError::TooLarge {
                field: "reopen_window_secs",
                max: MAX_REOPEN_WINDOW_SECS,
            });
        }
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::Zero {
                field: "lock_timeout_ms",
            });
        }
        if self.wait_average_window == 0 {
            return Err(ConfigError::Zero {
                field: "wait_average_window",
            });
        }
        Ok(())
    }
}

/// Grace-period scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between deadline checks (milliseconds).
    pub tick_interval_ms: u64,
    /// Re-read open absences from storage every this many ticks.
    pub sweep_every_ticks: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            sweep_every_ticks: 30,
        }
    }
}

impl SchedulerConfig {
    /// At least one millisecond.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Ticks between storage sweeps, at least one.
    pub fn sweep_period(&self) -> u64 {
        self.sweep_every_ticks.max(1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Zero {
                field: "tick_interval_ms",
            });
        }
        if self.sweep_every_ticks == 0 {
            return Err(ConfigError::Zero {
                field: "sweep_every_ticks",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.default_grace_period_minutes, 10);
        assert_eq!(config.reopen_window(), ChronoDuration::minutes(5));
        assert!(config.validate().is_ok());
        assert!(SchedulerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_rejected() {
        let config = QueueConfig {
            lock_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "lock_timeout_ms"
            })
        );
        let scheduler = SchedulerConfig {
            sweep_every_ticks: 0,
            ..Default::default()
        };
        assert!(scheduler.validate().is_err());
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let config = QueueConfig {
            reopen_window_secs: u64::MAX,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooLarge {
                field: "reopen_window_secs",
                max: MAX_REOPEN_WINDOW_SECS
            })
        );
        assert_eq!(config.reopen_window(), ChronoDuration::days(1));

        let scheduler = SchedulerConfig {
            tick_interval_ms: 0,
            sweep_every_ticks: 0,
        };
        assert_eq!(scheduler.tick_interval(), Duration::from_millis(1));
        assert_eq!(scheduler.sweep_period(), 1);
    }
}
