//! Time source used by the limiters.
//!
//! Every limiter reads the time and sleeps through a [`Clock`], so callers can
//! substitute their own implementation (for example to observe sleeps).

use std::fmt::Debug;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::time::Instant;

/// Supplies the current time and a way to wait.
///
/// The sleep is returned as a boxed future so a single `Arc<dyn Clock>` can be
/// shared between the master and all group limiters.
pub trait Clock: Send + Sync + Debug {
    /// The current time.
    fn now(&self) -> Instant;

    /// A future that completes once at least `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// The default clock, backed by tokio's timer.
///
/// Under `#[tokio::test(start_paused = true)]` this clock is fully
/// deterministic: time only moves when every task is waiting on a sleep.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed()
    }
}
