//! # Pacer Core - repeating timers
//!
//! Pacer runs a callback at a fixed interval until it is stopped, with:
//!
//! - **Two drift policies**: [`Policy::FixedSchedule`] keeps ticks aligned to
//!   `anchor + N × interval` and skips ticks lost to an overrun;
//!   [`Policy::FixedDelay`] waits `interval` after each completion
//! - **No overlap**: one loop task per timer, one invocation at a time
//! - **Strict stop**: after [`Timer::stop`] returns no new invocation begins
//! - **Sync or async callbacks** behind one [`Invoker`] interface
//! - **Pluggable time base** through [`Clock`], with a virtual [`MockClock`]
//!   for tests
//!
//! ## Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use pacer_core::{Policy, Timer, TimerState};
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() {
//! let ticks = Arc::new(AtomicU32::new(0));
//! let counter = ticks.clone();
//!
//! let timer = Timer::from_fn(Duration::from_secs(1), Policy::FixedSchedule, move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     Ok::<(), std::io::Error>(())
//! })
//! .unwrap();
//!
//! timer.start().unwrap();
//! tokio::time::sleep(Duration::from_millis(3500)).await;
//! timer.stop_and_wait().await;
//!
//! assert_eq!(ticks.load(Ordering::SeqCst), 3);
//! assert_eq!(timer.state(), TimerState::Stopped);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod timing;

pub use config::TimerConfig;
pub use error::{BoxError, CallbackError, ErrorCategory, Result, TimerError};
pub use timing::{
    AsyncInvoker, Clock, Instant, Invocation, Invoker, MockClock, NullObserver, Policy,
    Scheduler, SyncInvoker, Timer, TimerObserver, TimerState, TimerStats, TokioClock,
    TracingObserver, Wake,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
