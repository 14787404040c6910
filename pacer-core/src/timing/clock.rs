//! Monotonic time source used by the timer loop
//!
//! The loop only ever asks two things of a clock: what time it is, and to
//! suspend until a deadline. Implement [`Clock`] to plug in a different time
//! base (see [`MockClock`](super::MockClock) for a virtual one).

use async_trait::async_trait;

use crate::error::Result;

/// Opaque monotonic instant
///
/// This is tokio's instant so that a paused tokio clock (`tokio::time::pause`)
/// also drives timers built on [`TokioClock`](super::TokioClock).
pub use tokio::time::Instant;

/// Abstract monotonic clock
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant; never goes backwards
    fn now(&self) -> Instant;

    /// Suspend until `deadline` has been reached
    ///
    /// Returns immediately if the deadline is already in the past. An error
    /// means the time base is unusable and ends the timer that asked.
    async fn sleep_until(&self, deadline: Instant) -> Result<()>;

    /// Clock name (for logging)
    fn name(&self) -> &'static str;
}
