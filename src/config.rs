//! Construction-time options shared by the master and group limiters.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, TokioClock};
use crate::Error;

/// Options applied when a [`PacingLimiter`](crate::PacingLimiter) is built.
///
/// The defaults are a one second interval, no slack and the [`TokioClock`].
#[derive(Debug, Clone)]
pub struct LimiterOptions {
    pub(crate) per: Duration,
    pub(crate) slack: u32,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Default for LimiterOptions {
    fn default() -> Self {
        Self {
            per: Duration::from_secs(1),
            slack: 0,
            clock: Arc::new(TokioClock),
        }
    }
}

impl LimiterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measure the rate over `per` instead of one second.
    pub fn per(mut self, per: Duration) -> Self {
        self.per = per;
        self
    }

    /// Allow up to `slack` unused requests to be banked during idle periods
    /// and spent later as a burst.
    pub fn with_slack(mut self, slack: u32) -> Self {
        self.slack = slack;
        self
    }

    /// Strict uniform pacing: nothing is banked while idle.
    pub fn without_slack(self) -> Self {
        self.with_slack(0)
    }

    /// Replace the time source.
    pub fn with_clock<C: Clock + 'static>(self, clock: C) -> Self {
        self.with_shared_clock(Arc::new(clock))
    }

    /// Replace the time source with one that is already shared.
    pub fn with_shared_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn interval(&self) -> Duration {
        self.per
    }

    pub fn slack(&self) -> u32 {
        self.slack
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Check the options on their own, independent of any rate.
    pub fn validate(&self) -> Result<(), Error> {
        if self.per.is_zero() {
            return Err(Error::InvalidInterval);
        }
        Ok(())
    }
}

/// Source of the master rate and the per-group rates.
///
/// How these numbers are loaded (file, environment, flags) is up to the
/// implementor.
pub trait GroupRates {
    fn master_rate(&self) -> u32;
    fn group_rates(&self) -> &HashMap<String, u32>;
}

/// A plain in-memory [`GroupRates`].
#[derive(Debug, Clone, Default)]
pub struct GroupRatesConfig {
    pub master: u32,
    pub groups: HashMap<String, u32>,
}

impl GroupRatesConfig {
    pub fn new(master: u32) -> Self {
        Self {
            master,
            groups: HashMap::new(),
        }
    }

    /// Builder-style: declare a group.
    pub fn group(mut self, name: impl Into<String>, rate: u32) -> Self {
        self.groups.insert(name.into(), rate);
        self
    }
}

impl GroupRates for GroupRatesConfig {
    fn master_rate(&self) -> u32 {
        self.master
    }

    fn group_rates(&self) -> &HashMap<String, u32> {
        &self.groups
    }
}
