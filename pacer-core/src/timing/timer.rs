//! Repeating timer
//!
//! A [`Timer`] owns one loop task. The loop asks the [`Scheduler`] for the
//! next wake instant, suspends until then (or until `stop()`), invokes the
//! callback to completion, and repeats.
//!
//! ## Guarantees
//!
//! - Invocations never overlap: the next wake is only computed after the
//!   previous invocation has fully completed.
//! - Once `stop()` returns, no new invocation begins. The stop flag and the
//!   "about to invoke" check share one lock, so an invocation either started
//!   before `stop()` took it or never starts.
//! - `stop()` does not wait for an invocation already in progress. Use
//!   [`Timer::stopped`] or [`Timer::stop_and_wait`] for that.
//! - A stopped timer cannot be restarted; construct a new one.
//!
//! Dropping a `Timer` stops it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::Instrument;

use crate::config::TimerConfig;
use crate::error::{BoxError, Result, TimerError};
use crate::timing::clock::{Clock, Instant};
use crate::timing::invoker::{AsyncInvoker, Invocation, Invoker, SyncInvoker};
use crate::timing::observer::{TimerObserver, TracingObserver};
use crate::timing::scheduler::Scheduler;
use crate::timing::{Policy, TimerState, TokioClock};

/// State shared between the control-plane calls and the loop
#[derive(Debug)]
struct Control {
    state: TimerState,
    stop_requested: bool,
    anchor: Option<Instant>,
    tick_index: u64,
    invocations: u64,
    failures: u64,
    skipped_ticks: u64,
    last_started_at: Option<DateTime<Utc>>,
    last_completed_at: Option<DateTime<Utc>>,
}

struct Shared {
    control: Mutex<Control>,
    /// Flipped to `true` once by `stop()`; wakes a pending suspension
    stop_tx: watch::Sender<bool>,
    /// Flipped to `true` once the loop has exited (or will never run)
    done_tx: watch::Sender<bool>,
}

impl Shared {
    fn snapshot(&self, name: &str, policy: Policy, interval: Duration) -> TimerStats {
        let control = self.control.lock();
        TimerStats {
            name: name.to_string(),
            state: control.state,
            policy,
            interval_ms: saturating_u64(interval.as_millis()),
            tick_index: control.tick_index,
            invocations: control.invocations,
            failures: control.failures,
            skipped_ticks: control.skipped_ticks,
            last_started_at: control.last_started_at,
            last_completed_at: control.last_completed_at,
        }
    }
}

/// Point-in-time statistics for a timer
#[derive(Debug, Clone, Serialize)]
pub struct TimerStats {
    pub name: String,
    pub state: TimerState,
    pub policy: Policy,
    pub interval_ms: u64,
    /// Tick index of the latest invocation (0 before the first)
    pub tick_index: u64,
    /// Invocations started
    pub invocations: u64,
    /// Invocations whose callback failed or panicked
    pub failures: u64,
    /// Ticks passed over after overruns (fixed schedule only)
    pub skipped_ticks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_completed_at: Option<DateTime<Utc>>,
}

/// Repeating timer with a fixed interval and drift policy
pub struct Timer {
    name: String,
    interval: Duration,
    policy: Policy,
    invoker: Arc<dyn Invoker>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn TimerObserver>,
    shared: Arc<Shared>,
}

impl Timer {
    /// Create a fixed-schedule timer around any [`Invoker`]
    pub fn new<I>(interval: Duration, invoker: I) -> Result<Self>
    where
        I: Invoker + 'static,
    {
        Self::with_policy(interval, Policy::FixedSchedule, invoker)
    }

    /// Create a timer with an explicit policy
    pub fn with_policy<I>(interval: Duration, policy: Policy, invoker: I) -> Result<Self>
    where
        I: Invoker + 'static,
    {
        if interval.is_zero() {
            return Err(TimerError::InvalidInterval {
                interval_ms: interval.as_millis(),
            });
        }

        let (stop_tx, _) = watch::channel(false);
        let (done_tx, _) = watch::channel(false);

        Ok(Self {
            name: uuid::Uuid::new_v4().to_string(),
            interval,
            policy,
            invoker: Arc::new(invoker),
            clock: Arc::new(TokioClock::new()),
            observer: Arc::new(TracingObserver),
            shared: Arc::new(Shared {
                control: Mutex::new(Control {
                    state: TimerState::Created,
                    stop_requested: false,
                    anchor: None,
                    tick_index: 0,
                    invocations: 0,
                    failures: 0,
                    skipped_ticks: 0,
                    last_started_at: None,
                    last_completed_at: None,
                }),
                stop_tx,
                done_tx,
            }),
        })
    }

    /// Create a timer from a callback that completes immediately
    pub fn from_fn<F, E>(interval: Duration, policy: Policy, callback: F) -> Result<Self>
    where
        F: Fn() -> std::result::Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        Self::with_policy(interval, policy, SyncInvoker::new(callback))
    }

    /// Create a timer from a callback whose result must be awaited
    pub fn from_async<F, Fut, E>(interval: Duration, policy: Policy, callback: F) -> Result<Self>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self::with_policy(interval, policy, AsyncInvoker::new(callback))
    }

    /// Create a timer from a validated configuration
    pub fn from_config<I>(config: &TimerConfig, invoker: I) -> Result<Self>
    where
        I: Invoker + 'static,
    {
        config.validate()?;
        let timer = Self::with_policy(config.interval(), config.policy, invoker)?;
        Ok(match config.name.as_deref() {
            Some(name) => timer.with_name(name),
            None => timer,
        })
    }

    /// Use a different clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a different observer (default: [`TracingObserver`])
    pub fn with_observer(mut self, observer: Arc<dyn TimerObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Set the name used in logs and stats (default: a random UUID)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Start the loop on the current tokio runtime
    ///
    /// Returns immediately. Fails with `AlreadyStarted` unless the timer is
    /// in the CREATED state, and with `NoRuntime` outside a runtime.
    pub fn start(&self) -> Result<()> {
        let handle = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        self.start_on(&handle)
    }

    /// Start the loop on the given runtime
    pub fn start_on(&self, handle: &Handle) -> Result<()> {
        let anchor = {
            let mut control = self.shared.control.lock();
            if control.state != TimerState::Created {
                return Err(TimerError::AlreadyStarted {
                    state: control.state,
                });
            }
            let anchor = self.clock.now();
            control.anchor = Some(anchor);
            control.state = TimerState::Running;
            anchor
        };

        let task = TimerLoop {
            name: self.name.clone(),
            interval: self.interval,
            policy: self.policy,
            anchor,
            invoker: self.invoker.clone(),
            clock: self.clock.clone(),
            observer: self.observer.clone(),
            shared: self.shared.clone(),
        };
        // Owned by the spawned future so a task dropped before its first poll
        // still leaves the timer STOPPED.
        let guard = ExitGuard {
            shared: self.shared.clone(),
        };
        let span = tracing::info_span!(
            "timer",
            name = %self.name,
            policy = %self.policy,
            interval_ms = saturating_u64(self.interval.as_millis()),
        );
        handle.spawn(
            async move {
                let _guard = guard;
                task.run().await;
            }
            .instrument(span),
        );

        tracing::debug!(timer = %self.name, clock = self.clock.name(), "timer started");
        Ok(())
    }

    /// Stop the timer
    ///
    /// Idempotent and callable from any state or thread. Returns without
    /// waiting for an in-flight invocation; no new invocation begins after
    /// this returns.
    pub fn stop(&self) {
        let previous = {
            let mut control = self.shared.control.lock();
            if control.stop_requested {
                return;
            }
            control.stop_requested = true;
            std::mem::replace(&mut control.state, TimerState::Stopped)
        };

        self.shared.stop_tx.send_replace(true);
        if previous == TimerState::Created {
            // no loop will ever run
            self.shared.done_tx.send_replace(true);
        }

        tracing::debug!(timer = %self.name, previous = %previous, "stop requested");
    }

    /// Wait until the loop has exited
    ///
    /// Resolves once the timer is STOPPED and any in-flight invocation has
    /// completed. Never resolves for a timer that is neither started nor
    /// stopped, and must not be awaited from inside the timer's own callback.
    pub async fn stopped(&self) {
        let mut done = self.shared.done_tx.subscribe();
        let _ = done.wait_for(|done| *done).await;
    }

    /// Stop and wait for an in-flight invocation to finish
    pub async fn stop_and_wait(&self) {
        self.stop();
        self.stopped().await;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn state(&self) -> TimerState {
        self.shared.control.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == TimerState::Running
    }

    /// The instant `start()` was called, if it has been
    pub fn anchor(&self) -> Option<Instant> {
        self.shared.control.lock().anchor
    }

    /// Tick index of the latest invocation
    pub fn tick_index(&self) -> u64 {
        self.shared.control.lock().tick_index
    }

    pub fn stats(&self) -> TimerStats {
        self.shared.snapshot(&self.name, self.policy, self.interval)
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("policy", &self.policy)
            .field("state", &self.state())
            .field("clock", &self.clock.name())
            .finish()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn saturating_u64(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Why the loop exited
enum Exit {
    Stopped,
    Fault(TimerError),
}

/// Marks the timer stopped however the loop task ends: normal exit,
/// unwinding, or being dropped by a runtime that never polled it
struct ExitGuard {
    shared: Arc<Shared>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        {
            let mut control = self.shared.control.lock();
            control.stop_requested = true;
            control.state = TimerState::Stopped;
        }
        self.shared.done_tx.send_replace(true);
    }
}

/// Everything the loop task owns
struct TimerLoop {
    name: String,
    interval: Duration,
    policy: Policy,
    anchor: Instant,
    invoker: Arc<dyn Invoker>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn TimerObserver>,
    shared: Arc<Shared>,
}

impl TimerLoop {
    async fn run(self) {
        let mut stop_rx = self.shared.stop_tx.subscribe();
        let mut last_completion: Option<Instant> = None;

        let exit = loop {
            let wake = {
                let control = self.shared.control.lock();
                if control.stop_requested {
                    break Exit::Stopped;
                }
                Scheduler::next_wake(
                    self.policy,
                    self.anchor,
                    control.tick_index,
                    last_completion,
                    self.interval,
                    self.clock.now(),
                )
            };

            tokio::select! {
                biased;
                _ = stop_rx.wait_for(|stop| *stop) => break Exit::Stopped,
                slept = self.clock.sleep_until(wake.at) => {
                    if let Err(err) = slept {
                        break Exit::Fault(err);
                    }
                }
            }

            // Linearization point against stop(): check and commit under one lock.
            let started_at = {
                let mut control = self.shared.control.lock();
                if control.stop_requested {
                    break Exit::Stopped;
                }
                control.tick_index = wake.tick;
                control.skipped_ticks += wake.skipped;
                control.invocations += 1;
                control.last_started_at = Some(Utc::now());
                self.clock.now()
            };

            if wake.skipped > 0 {
                self.observer
                    .on_ticks_skipped(&self.name, wake.tick - wake.skipped, wake.tick);
            }
            self.observer.on_tick_started(&self.name, wake.tick);

            let result = self.invoker.invoke().await;
            let completed_at = self.clock.now();
            last_completion = Some(completed_at);

            {
                let mut control = self.shared.control.lock();
                control.last_completed_at = Some(Utc::now());
                if result.is_err() {
                    control.failures += 1;
                }
            }

            if let Err(err) = &result {
                self.observer.on_callback_error(&self.name, wake.tick, err);
            }
            let invocation = Invocation {
                tick: wake.tick,
                started_at,
                completed_at,
                result,
            };
            self.observer.on_tick_completed(&self.name, &invocation);
        };

        if let Exit::Fault(err) = &exit {
            self.observer.on_fatal(&self.name, err);
        }

        {
            let mut control = self.shared.control.lock();
            control.stop_requested = true;
            control.state = TimerState::Stopped;
        }
        let stats = self.shared.snapshot(&self.name, self.policy, self.interval);
        self.observer.on_stopped(&self.name, &stats);
    }
}
