//! # Pacer Timing
//!
//! The repeating timer and the pieces it is built from.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              Timer                                  │
//! │  • Owns state (CREATED → RUNNING → STOPPED)                         │
//! │  • Drives one loop task: wait → invoke → reschedule                 │
//! └──────────┬──────────────────────┬──────────────────────┬────────────┘
//!            │                      │                      │
//!            ▼                      ▼                      ▼
//! ┌────────────────────┐ ┌────────────────────┐ ┌────────────────────────┐
//! │ Scheduler (pure)   │ │ Invoker (trait)    │ │ Clock (trait)          │
//! │ next wake instant  │ │ SyncInvoker        │ │ TokioClock             │
//! │ per drift policy   │ │ AsyncInvoker       │ │ MockClock (testing)    │
//! └────────────────────┘ └────────────────────┘ └────────────────────────┘
//! ```
//!
//! ## Policies
//!
//! - [`Policy::FixedSchedule`]: ticks land on `anchor + N × interval`. An
//!   overrun skips the ticks it covered instead of bursting to catch up.
//! - [`Policy::FixedDelay`]: each tick lands `interval` after the previous
//!   invocation completed.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use pacer_core::timing::{Policy, Timer};
//!
//! # async fn run() -> pacer_core::Result<()> {
//! let timer = Timer::from_async(Duration::from_secs(30), Policy::FixedDelay, || async {
//!     // poll something
//!     Ok::<(), std::io::Error>(())
//! })?;
//!
//! timer.start()?;
//! // ...
//! timer.stop_and_wait().await;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod clock;
pub mod invoker;
pub mod observer;
pub mod scheduler;
pub mod timer;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use backends::{MockClock, TokioClock};
pub use clock::{Clock, Instant};
pub use invoker::{AsyncInvoker, Invocation, Invoker, SyncInvoker};
pub use observer::{NullObserver, TimerObserver, TracingObserver};
pub use scheduler::{Scheduler, Wake};
pub use timer::{Timer, TimerStats};

/// Drift policy of a repeating timer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Anchor-relative: tick N is due at `anchor + N × interval`
    #[default]
    FixedSchedule,
    /// Completion-relative: the next tick is due `interval` after the last completion
    FixedDelay,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::FixedSchedule => "fixed_schedule",
            Policy::FixedDelay => "fixed_delay",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a timer
///
/// `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    /// Constructed, `start()` not called yet
    Created,
    /// Loop task is live
    Running,
    /// Stopped by `stop()` or by a fatal fault
    Stopped,
}

impl TimerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerState::Created => "created",
            TimerState::Running => "running",
            TimerState::Stopped => "stopped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TimerState::Stopped)
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_default_is_fixed_schedule() {
        assert_eq!(Policy::default(), Policy::FixedSchedule);
    }

    #[test]
    fn test_policy_serde_names() {
        assert_eq!(
            serde_json::to_string(&Policy::FixedDelay).unwrap(),
            "\"fixed_delay\""
        );
        let policy: Policy = serde_json::from_str("\"fixed_schedule\"").unwrap();
        assert_eq!(policy, Policy::FixedSchedule);
        assert_eq!(Policy::FixedDelay.to_string(), "fixed_delay");
    }

    #[test]
    fn test_timer_state_display() {
        assert_eq!(TimerState::Created.to_string(), "created");
        assert_eq!(TimerState::Running.to_string(), "running");
        assert!(TimerState::Stopped.is_terminal());
        assert!(!TimerState::Running.is_terminal());
    }
}
