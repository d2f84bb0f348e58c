use std::time::Duration;

/// Configuration errors raised while building limiters.
///
/// Admission itself never fails; these only surface from constructors and
/// group registration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The rate was zero.
    #[error("rate must be positive")]
    InvalidRate,
    /// The interval the rate is measured over was zero.
    #[error("interval must be non-zero")]
    InvalidInterval,
    /// `per / rate` truncated to a zero spacing between requests.
    #[error("rate {rate} per {per:?} is too high to pace")]
    IntervalTooSmall {
        /// Requests per interval.
        rate: u32,
        /// The interval.
        per: Duration,
    },
    /// `per / rate` is too long to schedule against the clock.
    #[error("rate {rate} per {per:?} is too slow to schedule")]
    IntervalTooLarge {
        /// Requests per interval.
        rate: u32,
        /// The interval.
        per: Duration,
    },
    /// A group's limiter could not be built.
    #[error("group `{group}`: {source}")]
    InvalidGroup {
        /// Name of the offending group.
        group: String,
        /// Why its limiter was rejected.
        #[source]
        source: Box<Error>,
    },
}
