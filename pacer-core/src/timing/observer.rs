//! Timer lifecycle hooks
//!
//! Callback errors never leave the timer loop; this is where they surface.

use crate::error::{CallbackError, TimerError};
use crate::timing::invoker::Invocation;
use crate::timing::timer::TimerStats;

/// Observer for timer events
///
/// Every method has a no-op default, so implementors only override what
/// they care about. Methods are called from the timer's own task and
/// should return quickly: time spent here delays the next scheduling
/// decision just like time spent in the callback.
pub trait TimerObserver: Send + Sync {
    /// An invocation is about to begin
    fn on_tick_started(&self, _timer: &str, _tick: u64) {}

    /// An invocation finished (successfully or not)
    fn on_tick_completed(&self, _timer: &str, _invocation: &Invocation) {}

    /// The callback returned an error or panicked; the timer keeps running
    fn on_callback_error(&self, _timer: &str, _tick: u64, _error: &CallbackError) {}

    /// Ticks `from..to` were passed over after an overrun (fixed schedule only)
    fn on_ticks_skipped(&self, _timer: &str, _from: u64, _to: u64) {}

    /// The timer hit a fatal fault and is stopping
    fn on_fatal(&self, _timer: &str, _error: &TimerError) {}

    /// The loop has exited; no further invocation will happen
    fn on_stopped(&self, _timer: &str, _stats: &TimerStats) {}
}

/// Observer that emits `tracing` events (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TimerObserver for TracingObserver {
    fn on_tick_started(&self, timer: &str, tick: u64) {
        tracing::trace!(timer, tick, "tick started");
    }

    fn on_tick_completed(&self, timer: &str, invocation: &Invocation) {
        tracing::debug!(
            timer,
            tick = invocation.tick,
            duration_us = u64::try_from(invocation.duration().as_micros()).unwrap_or(u64::MAX),
            ok = invocation.is_ok(),
            "tick completed"
        );
    }

    fn on_callback_error(&self, timer: &str, tick: u64, error: &CallbackError) {
        tracing::warn!(timer, tick, error = %error, "timer callback failed");
    }

    fn on_ticks_skipped(&self, timer: &str, from: u64, to: u64) {
        tracing::debug!(timer, from, to, skipped = to - from, "overrun, skipping ticks");
    }

    fn on_fatal(&self, timer: &str, error: &TimerError) {
        tracing::error!(timer, code = error.error_code(), error = %error, "timer stopped by fault");
    }

    fn on_stopped(&self, timer: &str, stats: &TimerStats) {
        tracing::info!(
            timer,
            invocations = stats.invocations,
            failures = stats.failures,
            skipped = stats.skipped_ticks,
            "timer stopped"
        );
    }
}

/// No-op observer
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl TimerObserver for NullObserver {}
