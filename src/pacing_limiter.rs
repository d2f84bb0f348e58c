use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::time::Instant;

use crate::clock::Clock;
use crate::{Error, LimiterOptions};

/// Anything that can admit one request at a time.
///
/// `take` resolves at the moment the request is let through and yields that
/// admission time.
pub trait Limiter: Send + Sync {
    fn take(&self) -> BoxFuture<'_, Instant>;
}

/// A leaky-bucket limiter that spaces admissions `per / rate` apart.
///
/// Each call to [`take`](PacingLimiter::take) reserves the next slot under a
/// short lock and then sleeps, outside the lock, until that slot arrives.
/// With slack enabled, idle time is banked (up to `slack` requests) so a
/// burst may follow a quiet period.
#[derive(Debug)]
pub struct PacingLimiter {
    per_request: Duration,
    max_slack: Duration,
    /// The last reserved slot, `None` until the first admission.
    last_slot: Mutex<Option<Instant>>,
    clock: Arc<dyn Clock>,
}

impl PacingLimiter {
    pub fn new(rate: u32, options: &LimiterOptions) -> Result<Self, Error> {
        options.validate()?;
        if rate == 0 {
            return Err(Error::InvalidRate);
        }

        let per_request = options.per / rate;
        if per_request.is_zero() {
            return Err(Error::IntervalTooSmall {
                rate,
                per: options.per,
            });
        }
        // Slots are computed as `last + per_request`, so a spacing that cannot
        // be added to the current time would overflow on a later `take`.
        if options
            .clock
            .now()
            .checked_add(per_request.saturating_mul(2))
            .is_none()
        {
            return Err(Error::IntervalTooLarge {
                rate,
                per: options.per,
            });
        }

        Ok(Self {
            per_request,
            max_slack: per_request.saturating_mul(options.slack),
            last_slot: Mutex::new(None),
            clock: Arc::clone(&options.clock),
        })
    }

    /// The nominal spacing between two admissions.
    pub fn per_request(&self) -> Duration {
        self.per_request
    }

    /// How much idle time may be banked for a later burst.
    pub fn max_slack(&self) -> Duration {
        self.max_slack
    }

    /// Wait until this limiter admits one more request, returning the
    /// admission time.
    ///
    /// A request that did not have to wait (the first one, one after an idle
    /// period, or one spending banked slack) is stamped with the clock's
    /// current time, so a burst yields several identical timestamps.
    pub async fn take(&self) -> Instant {
        let (now, slot) = self.reserve();

        if slot > now {
            let wait = slot - now;
            tracing::trace!(?wait, "pacing limiter sleeping until slot");
            self.clock.sleep(wait).await;
            slot
        } else {
            now
        }
    }

    /// Commit the next slot and return it along with the time it was computed at.
    /// The state only ever moves forward.
    fn reserve(&self) -> (Instant, Instant) {
        // The state is a single timestamp, so a panic elsewhere cannot leave it torn.
        let mut last_slot = self
            .last_slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();

        let slot = match *last_slot {
            None => now,
            Some(last) => {
                let idle = now.saturating_duration_since(last);
                if self.max_slack.is_zero() {
                    if idle > self.per_request {
                        now
                    } else {
                        last + self.per_request
                    }
                } else if idle > self.max_slack.saturating_add(self.per_request) {
                    // Bank at most `max_slack` of the idle time.
                    last + (idle - self.max_slack)
                } else {
                    last + self.per_request
                }
            }
        };

        *last_slot = Some(slot);
        (now, slot)
    }

    #[cfg(test)]
    fn last_slot(&self) -> Option<Instant> {
        *self
            .last_slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Limiter for PacingLimiter {
    fn take(&self) -> BoxFuture<'_, Instant> {
        PacingLimiter::take(self).boxed()
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::time::advance;

    #[test]
    fn test_invalid_rates() {
        let options = LimiterOptions::default();
        assert!(matches!(
            PacingLimiter::new(0, &options),
            Err(Error::InvalidRate)
        ));

        let options = LimiterOptions::default().per(Duration::from_nanos(5));
        assert!(matches!(
            PacingLimiter::new(10, &options),
            Err(Error::IntervalTooSmall { rate: 10, .. })
        ));

        let options = LimiterOptions::default().per(Duration::ZERO);
        assert!(matches!(
            PacingLimiter::new(10, &options),
            Err(Error::InvalidInterval)
        ));
    }

    /// A spacing that cannot be added to an `Instant` is rejected up front
    /// rather than overflowing on the second `take`.
    #[test]
    fn test_interval_too_large() {
        let options = LimiterOptions::default().per(Duration::MAX);
        assert!(matches!(
            PacingLimiter::new(1, &options),
            Err(Error::IntervalTooLarge { rate: 1, .. })
        ));
    }

    /// A long but representable spacing is still paced normally.
    #[tokio::test(start_paused = true)]
    async fn test_long_interval_accepted() {
        let limiter = limiter(1, LimiterOptions::default().per(Duration::from_secs(3600)));
        let start = Instant::now();

        assert_eq!(limiter.take().await, start);
        assert_eq!(limiter.take().await, start + Duration::from_secs(3600));
    }

    #[test]
    fn test_derived_intervals() {
        let limiter = limiter(100, LimiterOptions::default().with_slack(10));
        assert_eq!(limiter.per_request(), Duration::from_millis(10));
        assert_eq!(limiter.max_slack(), Duration::from_millis(100));

        let limiter = limiter_half_second();
        assert_eq!(limiter.per_request(), Duration::from_millis(5));
        assert_eq!(limiter.max_slack(), Duration::ZERO);
    }

    fn limiter_half_second() -> PacingLimiter {
        limiter(100, LimiterOptions::default().per(Duration::from_millis(500)))
    }

    /// The first request goes straight through, the rest are spaced evenly.
    #[tokio::test(start_paused = true)]
    async fn test_uniform_spacing() {
        let limiter = limiter(10, LimiterOptions::default());
        let start = Instant::now();

        assert_eq!(limiter.take().await, start);
        assert_eq!(elapsed(&start), Duration::ZERO);

        for i in 1..5u32 {
            let admitted = limiter.take().await;
            assert_eq!(admitted, start + Duration::from_millis(100) * i);
            assert_eq!(elapsed(&start), Duration::from_millis(100) * i);
        }
    }

    /// Without slack a long pause does not earn a burst.
    #[tokio::test(start_paused = true)]
    async fn test_idle_without_slack() {
        let limiter = limiter(10, LimiterOptions::default());
        limiter.take().await;

        advance(Duration::from_secs(5)).await;
        let resumed = Instant::now();

        assert_eq!(limiter.take().await, resumed);
        assert_eq!(limiter.take().await, resumed + Duration::from_millis(100));
        assert_eq!(elapsed(&resumed), Duration::from_millis(100));
    }

    /// A caller that is only slightly late keeps the planned schedule.
    #[tokio::test(start_paused = true)]
    async fn test_late_within_one_interval() {
        let limiter = limiter(10, LimiterOptions::default());
        let start = Instant::now();
        limiter.take().await;

        advance(Duration::from_millis(60)).await;
        assert_eq!(limiter.take().await, start + Duration::from_millis(100));
        assert_eq!(elapsed(&start), Duration::from_millis(100));
    }

    /// After an idle period, at most `slack` extra requests get through at once.
    #[tokio::test(start_paused = true)]
    async fn test_slack_burst_is_bounded() {
        let limiter = limiter(10, LimiterOptions::default().with_slack(3));
        limiter.take().await;

        advance(Duration::from_secs(10)).await;
        let resumed = Instant::now();

        // One regular admission plus three banked ones.
        for _ in 0..4 {
            assert_eq!(limiter.take().await, resumed);
        }
        assert_eq!(elapsed(&resumed), Duration::ZERO);

        // Then back to nominal spacing.
        assert_eq!(limiter.take().await, resumed + Duration::from_millis(100));
        assert_eq!(limiter.take().await, resumed + Duration::from_millis(200));
    }

    /// Short idle periods are credited in part.
    #[tokio::test(start_paused = true)]
    async fn test_partial_slack_credit() {
        let limiter = limiter(10, LimiterOptions::default().with_slack(3));
        let start = Instant::now();
        limiter.take().await;

        // 250ms idle: the slot schedule is still within slack, so it stays
        // at start + 100ms, start + 200ms, ...
        advance(Duration::from_millis(250)).await;
        let now = Instant::now();
        assert_eq!(limiter.take().await, now);
        assert_eq!(limiter.take().await, now);
        assert_eq!(limiter.last_slot(), Some(start + Duration::from_millis(200)));
        assert_eq!(limiter.take().await, start + Duration::from_millis(300));
        assert_eq!(elapsed(&start), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_never_move_backwards() {
        let limiter = limiter(50, LimiterOptions::default().with_slack(2));
        let mut previous = None;

        for step in [0u64, 3, 0, 90, 1, 0, 500, 0, 0, 0] {
            advance(Duration::from_millis(step)).await;
            limiter.take().await;
            let slot = limiter.last_slot();
            assert!(slot >= previous);
            previous = slot;
        }
    }
}
