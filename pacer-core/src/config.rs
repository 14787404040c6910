//! Configuration for timers

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TimerError};
use crate::timing::Policy;

/// Serializable timer configuration
///
/// ```rust
/// use pacer_core::{Policy, TimerConfig};
///
/// let json = r#"{ "interval_ms": 250, "policy": "fixed_delay" }"#;
/// let config = TimerConfig::from_json(json).unwrap();
/// assert_eq!(config.policy, Policy::FixedDelay);
/// assert_eq!(config.interval().as_millis(), 250);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Interval between ticks in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Drift policy
    #[serde(default)]
    pub policy: Policy,

    /// Name used in logs and stats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            policy: Policy::FixedSchedule,
            name: None,
        }
    }
}

impl TimerConfig {
    /// Build a configuration from a [`Duration`]
    ///
    /// Configurations are kept at millisecond granularity, so the interval
    /// must be a non-zero whole number of milliseconds.
    pub fn new(interval: Duration, policy: Policy) -> Result<Self> {
        if interval.is_zero() {
            return Err(TimerError::InvalidInterval { interval_ms: 0 });
        }
        if interval.subsec_nanos() % 1_000_000 != 0 {
            return Err(TimerError::InvalidConfig {
                reason: format!("interval {interval:?} is not a whole number of milliseconds"),
            });
        }
        let Ok(interval_ms) = u64::try_from(interval.as_millis()) else {
            return Err(TimerError::InvalidConfig {
                reason: format!("interval {interval:?} does not fit in u64 milliseconds"),
            });
        };

        Ok(Self {
            interval_ms,
            policy,
            name: None,
        })
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: TimerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration can build a timer
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(TimerError::InvalidInterval { interval_ms: 0 });
        }
        if matches!(self.name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(TimerError::InvalidConfig {
                reason: "name must not be blank".to_string(),
            });
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
