//! Clock implementations
//!
//! - `TokioClock`: the default, backed by `tokio::time`
//! - `MockClock`: virtual time for tests, with fault injection
//!
//! ## Choosing a Clock
//!
//! - **Applications**: use `TokioClock` (what `Timer` uses unless told otherwise)
//! - **Tests of timer-driven code**: either `TokioClock` under
//!   `#[tokio::test(start_paused = true)]`, or `MockClock` when the test needs
//!   to inspect requested deadlines or make the clock fail

mod mock;
mod tokio_clock;

pub use mock::MockClock;
pub use tokio_clock::TokioClock;
