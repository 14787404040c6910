//! Next-wake computation for both drift policies
//!
//! Everything here is a pure function of its inputs: no clock reads, no
//! sleeping, no shared state. The timer loop feeds it the current instant.

use std::time::Duration;

use crate::timing::clock::Instant;
use crate::timing::Policy;

/// Upper bound for an ideal instant's offset from the anchor (~30 years)
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Outcome of a scheduling decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wake {
    /// Instant the loop should suspend until
    pub at: Instant,
    /// Tick index this wake belongs to (becomes the timer's `tick_index`)
    pub tick: u64,
    /// Ticks passed over because their ideal instant was not in the future
    pub skipped: u64,
}

/// Drift policy arithmetic
#[derive(Debug, Clone, Copy, Default)]
pub struct Scheduler;

impl Scheduler {
    /// Compute the next wake instant
    ///
    /// - `tick_index`: ticks issued so far (0 before the first tick)
    /// - `last_completion`: when the previous invocation finished, `None`
    ///   before the first one
    ///
    /// Under [`Policy::FixedSchedule`] the candidate is tick `tick_index + 1`
    /// at `anchor + N × interval`. If that instant is not strictly after
    /// `now`, the candidate moves forward to the first tick whose ideal
    /// instant is, and the ticks in between are reported as `skipped`.
    ///
    /// Under [`Policy::FixedDelay`] the wake is `last_completion + interval`
    /// (the anchor stands in for the first tick) and nothing is ever skipped.
    pub fn next_wake(
        policy: Policy,
        anchor: Instant,
        tick_index: u64,
        last_completion: Option<Instant>,
        interval: Duration,
        now: Instant,
    ) -> Wake {
        let candidate = tick_index.saturating_add(1);

        match policy {
            Policy::FixedSchedule => {
                let elapsed = now.saturating_duration_since(anchor);
                let first_future = Self::ticks_covering(elapsed, interval).saturating_add(1);
                let tick = candidate.max(first_future);

                Wake {
                    at: Self::ideal_instant(anchor, interval, tick),
                    tick,
                    skipped: tick - candidate,
                }
            }
            Policy::FixedDelay => {
                let base = last_completion.unwrap_or(anchor);

                Wake {
                    at: Self::offset(base, interval),
                    tick: candidate,
                    skipped: 0,
                }
            }
        }
    }

    /// Ideal instant of tick `n`: `anchor + n × interval`
    pub fn ideal_instant(anchor: Instant, interval: Duration, n: u64) -> Instant {
        let nanos = interval.as_nanos().saturating_mul(u128::from(n));
        let offset = if nanos >= FAR_FUTURE.as_nanos() {
            FAR_FUTURE
        } else {
            Duration::from_nanos(nanos as u64)
        };
        Self::offset(anchor, offset)
    }

    /// Number of whole intervals contained in `elapsed`
    fn ticks_covering(elapsed: Duration, interval: Duration) -> u64 {
        let per = interval.as_nanos().max(1);
        u64::try_from(elapsed.as_nanos() / per).unwrap_or(u64::MAX)
    }

    fn offset(base: Instant, by: Duration) -> Instant {
        base + by.min(FAR_FUTURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_fixed_schedule_first_tick() {
        let anchor = Instant::now();
        let wake = Scheduler::next_wake(Policy::FixedSchedule, anchor, 0, None, SEC, anchor);

        assert_eq!(wake.at, anchor + SEC);
        assert_eq!(wake.tick, 1);
        assert_eq!(wake.skipped, 0);
    }

    #[test]
    fn test_fixed_schedule_ignores_completion_time() {
        let anchor = Instant::now();
        // tick 2 ran from 2.0s to 2.4s
        let done = anchor + ms(2400);
        let wake = Scheduler::next_wake(Policy::FixedSchedule, anchor, 2, Some(done), SEC, done);

        assert_eq!(wake.at, anchor + 3 * SEC);
        assert_eq!(wake.tick, 3);
        assert_eq!(wake.skipped, 0);
    }

    #[test]
    fn test_fixed_schedule_overrun_skips_instead_of_bursting() {
        let anchor = Instant::now();
        // tick 2 started at 2s and ran for 3.5 intervals
        let done = anchor + ms(5500);
        let wake = Scheduler::next_wake(Policy::FixedSchedule, anchor, 2, Some(done), SEC, done);

        assert_eq!(wake.at, anchor + 6 * SEC);
        assert_eq!(wake.tick, 6);
        assert_eq!(wake.skipped, 3);
    }

    #[test]
    fn test_fixed_schedule_exact_boundary_is_skipped() {
        let anchor = Instant::now();
        // completion lands exactly on tick 3's ideal instant
        let done = anchor + 3 * SEC;
        let wake = Scheduler::next_wake(Policy::FixedSchedule, anchor, 2, Some(done), SEC, done);

        assert_eq!(wake.tick, 4);
        assert_eq!(wake.at, anchor + 4 * SEC);
        assert_eq!(wake.skipped, 1);
    }

    #[test]
    fn test_fixed_schedule_late_first_tick() {
        let anchor = Instant::now();
        let now = anchor + ms(1200);
        let wake = Scheduler::next_wake(Policy::FixedSchedule, anchor, 0, None, SEC, now);

        assert_eq!(wake.tick, 2);
        assert_eq!(wake.skipped, 1);
    }

    #[test]
    fn test_fixed_schedule_wake_is_always_future_and_aligned() {
        let anchor = Instant::now();
        let interval = ms(250);

        for tick_index in 0..20u64 {
            for now_ms in (0..6000u64).step_by(37) {
                let now = anchor + ms(now_ms);
                let wake = Scheduler::next_wake(
                    Policy::FixedSchedule,
                    anchor,
                    tick_index,
                    Some(now),
                    interval,
                    now,
                );

                assert!(wake.at > now);
                assert!(wake.tick > tick_index);
                assert_eq!(wake.at - anchor, interval * wake.tick as u32);
                assert_eq!(wake.skipped, wake.tick - tick_index - 1);
            }
        }
    }

    #[test]
    fn test_fixed_delay_first_tick_uses_anchor() {
        let anchor = Instant::now();
        let wake = Scheduler::next_wake(Policy::FixedDelay, anchor, 0, None, SEC, anchor);

        assert_eq!(wake.at, anchor + SEC);
        assert_eq!(wake.tick, 1);
    }

    #[test]
    fn test_fixed_delay_is_completion_relative() {
        let anchor = Instant::now();
        let done = anchor + ms(2500);
        let wake = Scheduler::next_wake(Policy::FixedDelay, anchor, 1, Some(done), SEC, done);

        assert_eq!(wake.at, anchor + ms(3500));
        assert_eq!(wake.tick, 2);
        assert_eq!(wake.skipped, 0);
    }

    #[test]
    fn test_fixed_delay_never_skips() {
        let anchor = Instant::now();
        // a very long overrun still yields the next sequential tick
        let done = anchor + Duration::from_secs(3600);
        let wake = Scheduler::next_wake(Policy::FixedDelay, anchor, 4, Some(done), SEC, done);

        assert_eq!(wake.tick, 5);
        assert_eq!(wake.skipped, 0);
        assert_eq!(wake.at, done + SEC);
    }

    #[test]
    fn test_ideal_instant_saturates() {
        let anchor = Instant::now();
        let far = Scheduler::ideal_instant(anchor, Duration::from_secs(3600), u64::MAX);

        assert_eq!(far - anchor, FAR_FUTURE);
        assert_eq!(Scheduler::ideal_instant(anchor, SEC, 0), anchor);
    }
}
