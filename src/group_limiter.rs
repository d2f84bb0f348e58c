//! Two-level admission: a master budget shared by every caller, subdivided
//! into named group budgets.
//!
//! A request for group `g` is let through once it is within the master rate
//! *and* within `g`'s own rate. Higher group rates therefore act as priority,
//! while the master rate stays the hard ceiling across all groups.
//!
//! The flow of [`GroupLimiter::take`] is:
//! 1. If the cancellation token has fired, return the current time without
//!    touching any limiter.
//! 2. Wait for the master limiter.
//! 3. If the token fired while waiting, return the master's admission time.
//!    The master slot stays consumed.
//! 4. Wait for the group's limiter and return its admission time. Unknown
//!    groups skip this step and only pay the master.
//!
//! Cancellation is only observed at those two checkpoints; a sleep that has
//! already started runs to completion.

use std::collections::HashMap;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::GroupRates;
use crate::{Error, Limiter, LimiterOptions, PacingLimiter};

/// Limits access to a resource across named groups.
///
/// Groups are registered during setup through methods that need exclusive
/// access (`self` or `&mut self`), while [`take`](GroupLimiter::take) only
/// needs `&self`. Sharing the limiter (for example behind an `Arc`) therefore
/// freezes its set of groups.
pub struct GroupLimiter {
    master: PacingLimiter,
    groups: HashMap<String, Box<dyn Limiter>>,
    options: LimiterOptions,
}

impl GroupLimiter {
    /// Create a limiter with only a master budget. `options` are kept and
    /// reused for every group added with [`add_group`](GroupLimiter::add_group).
    pub fn new(master_rate: u32, options: LimiterOptions) -> Result<Self, Error> {
        let master = PacingLimiter::new(master_rate, &options)?;
        tracing::debug!(
            master_rate,
            per_request = ?master.per_request(),
            "created group limiter"
        );

        Ok(Self {
            master,
            groups: HashMap::new(),
            options,
        })
    }

    /// Create a limiter with the master rate and every group declared in `config`.
    ///
    /// Groups are registered in name order, so the first invalid group by name
    /// is the one reported.
    pub fn from_config<C>(config: &C, options: LimiterOptions) -> Result<Self, Error>
    where
        C: GroupRates + ?Sized,
    {
        let mut groups: Vec<_> = config.group_rates().iter().collect();
        groups.sort_by(|a, b| a.0.cmp(b.0));

        groups
            .into_iter()
            .try_fold(Self::new(config.master_rate(), options)?, |limiter, (name, rate)| {
                limiter.add_group(name.as_str(), *rate)
            })
    }

    /// Register a group using the options this limiter was created with.
    ///
    /// Re-registering a name replaces its limiter.
    pub fn add_group(self, name: impl Into<String>, rate: u32) -> Result<Self, Error> {
        let options = self.options.clone();
        self.add_group_with(name, rate, options)
    }

    /// Register a group with its own options.
    pub fn add_group_with(
        mut self,
        name: impl Into<String>,
        rate: u32,
        options: LimiterOptions,
    ) -> Result<Self, Error> {
        let name = name.into();
        let limiter =
            PacingLimiter::new(rate, &options).map_err(|source| Error::InvalidGroup {
                group: name.clone(),
                source: Box::new(source),
            })?;
        tracing::debug!(group = %name, rate, "registering group");
        self.set_group(name, limiter);
        Ok(self)
    }

    /// Install any [`Limiter`] as the budget for `name`, replacing an existing one.
    pub fn set_group<L>(&mut self, name: impl Into<String>, limiter: L)
    where
        L: Limiter + 'static,
    {
        let name = name.into();
        if self.groups.insert(name.clone(), Box::new(limiter)).is_some() {
            tracing::debug!(group = %name, "replaced group limiter");
        }
    }

    pub fn contains_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn master(&self) -> &PacingLimiter {
        &self.master
    }

    /// Wait until a request for `group` fits both the master and the group
    /// budget, returning the time it was admitted.
    pub async fn take(&self, cancel: &CancellationToken, group: &str) -> Instant {
        if cancel.is_cancelled() {
            tracing::debug!(group, "cancelled before master gate");
            return self.options.clock.now();
        }

        let admitted = self.master.take().await;

        if cancel.is_cancelled() {
            tracing::debug!(group, "cancelled after master gate");
            return admitted;
        }

        match self.groups.get(group) {
            Some(limiter) => limiter.take().await,
            None => {
                tracing::trace!(group, "unknown group, master gate only");
                admitted
            }
        }
    }
}

impl std::fmt::Debug for GroupLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupLimiter")
            .field("master", &self.master)
            .field("groups", &self.groups.keys().collect::<Vec<_>>())
            .field("options", &self.options)
            .finish()
    }
}
