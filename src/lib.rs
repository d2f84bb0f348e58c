//! # Group Rate Limiter
//! Some downstream resources (an API, a worker pool) have a single global throughput budget that several kinds of callers compete for. This crate paces those callers with two levels of leaky-bucket limiters: a master budget that caps the total rate, and a budget per named group so that one group cannot starve the others. A caller names its group and is held back until it fits both.
//!
//! # Example
//! Here, we allow 1000 requests per second in total, of which the "search" group may use 100 per second and the "index" group 200 per second. Consecutive "search" requests are admitted 10ms apart, "index" requests 5ms apart.
//! ```
//! # use group_rate_limiter::{CancellationToken, GroupLimiter, LimiterOptions};
//! # #[tokio::main]
//! # async fn main() -> Result<(), group_rate_limiter::Error> {
//!     let limiter = GroupLimiter::new(1000, LimiterOptions::new().without_slack())?
//!         .add_group("search", 100)?
//!         .add_group("index", 200)?;
//!
//!     let cancel = CancellationToken::new();
//!     let first = limiter.take(&cancel, "search").await;
//!     let second = limiter.take(&cancel, "search").await;
//!     println!("{:?}", second - first);
//!
//!     // 10ms
//! #   Ok(())
//! # }
//! ```
//!
//! # Limitations
//! Groups can only be added while the limiter is exclusively owned, before it is shared between tasks.
//!
//! Unused capacity of an idle group is not handed to other groups.
//!
//! Cancellation is checked before the master gate and between the two gates, but never interrupts a wait that has already started.

mod clock;
mod config;
mod error;
mod group_limiter;
mod pacing_limiter;

pub use clock::{Clock, TokioClock};
pub use config::{GroupRates, GroupRatesConfig, LimiterOptions};
pub use error::Error;
pub use group_limiter::GroupLimiter;
pub use pacing_limiter::{Limiter, PacingLimiter};
pub use tokio_util::sync::CancellationToken;
