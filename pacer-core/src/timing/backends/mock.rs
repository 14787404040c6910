//! Mock clock for testing
//!
//! Virtual time that only moves when told to. Records every deadline the
//! timer loop asked to sleep until, so tests can check scheduling decisions
//! without waiting on a real clock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Result, TimerError};
use crate::timing::clock::{Clock, Instant};

#[derive(Debug)]
struct MockClockState {
    /// Virtual time elapsed since `base`
    elapsed: Duration,
    /// Every deadline passed to `sleep_until`, in call order
    deadlines: Vec<Instant>,
    /// Sleeps left before the clock starts failing
    sleeps_before_fault: Option<usize>,
}

/// Virtual-time clock
///
/// - `now()` is `base + elapsed`; only `advance()` and `sleep_until()` move it
/// - `sleep_until(deadline)` jumps virtual time to `deadline` (if it is in the
///   future) and yields once to the runtime
/// - `fail_after(n)` makes every sleep after the first `n` return
///   [`TimerError::ClockFault`]
///
/// Clones share the same virtual time, so a callback can hold a clone and
/// `advance()` it to simulate how long it "ran".
#[derive(Debug, Clone)]
pub struct MockClock {
    base: Instant,
    state: Arc<Mutex<MockClockState>>,
}

impl MockClock {
    /// Create a mock clock starting at the current tokio instant
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            state: Arc::new(Mutex::new(MockClockState {
                elapsed: Duration::ZERO,
                deadlines: Vec::new(),
                sleeps_before_fault: None,
            })),
        }
    }

    /// The instant virtual time started at
    pub fn base(&self) -> Instant {
        self.base
    }

    /// Virtual time elapsed since `base()`
    pub fn elapsed(&self) -> Duration {
        self.state.lock().elapsed
    }

    /// Move virtual time forward
    pub fn advance(&self, by: Duration) {
        self.state.lock().elapsed += by;
    }

    /// Let `n` more sleeps succeed, then fail every following one
    pub fn fail_after(&self, n: usize) {
        self.state.lock().sleeps_before_fault = Some(n);
    }

    /// All deadlines requested so far
    pub fn recorded_deadlines(&self) -> Vec<Instant> {
        self.state.lock().deadlines.clone()
    }

    /// Requested deadlines as offsets from `base()`
    pub fn recorded_offsets(&self) -> Vec<Duration> {
        self.state
            .lock()
            .deadlines
            .iter()
            .map(|d| d.saturating_duration_since(self.base))
            .collect()
    }

    /// Number of sleeps requested
    pub fn sleep_count(&self) -> usize {
        self.state.lock().deadlines.len()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.base + self.state.lock().elapsed
    }

    async fn sleep_until(&self, deadline: Instant) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.deadlines.push(deadline);

            if let Some(remaining) = state.sleeps_before_fault.as_mut() {
                if *remaining == 0 {
                    return Err(TimerError::ClockFault {
                        reason: "mock clock fault injected".to_string(),
                    });
                }
                *remaining -= 1;
            }

            let target = deadline.saturating_duration_since(self.base);
            if target > state.elapsed {
                state.elapsed = target;
            }
        }

        tokio::task::yield_now().await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
