//! Rate-aware spacing of poll requests.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::warn;

use crate::domain::{FeedKind, Subscription};
use crate::error::ExchangeError;
use crate::port::exchange::RateLimit;

/// Spacing between successive requests within one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Minimum time the exchange wants between a full round of requests.
    pub interval: Duration,
    /// Requests per cycle. Balances are batched into a single request.
    pub requests: u32,
}

impl PollSchedule {
    /// Build the schedule for `polling` given the exchange's rate limit lookup.
    ///
    /// Falls back to `default_interval` when the exchange publishes no
    /// limits or the lookup fails.
    pub fn new(
        exchange: &str,
        rate_limits: Result<Option<Vec<RateLimit>>, ExchangeError>,
        default_interval: Duration,
        polling: &BTreeSet<Subscription>,
    ) -> Self {
        let interval = match rate_limits {
            Ok(limits) => limits
                .and_then(|limits| limits.iter().map(RateLimit::poll_delay).max())
                .unwrap_or(default_interval),
            Err(error) => {
                warn!(exchange, error = %error, "Rate limit lookup failed, using default interval");
                default_interval
            }
        };
        Self {
            interval,
            requests: request_count(polling),
        }
    }

    /// Sleep after each request, `None` when there is nothing to pace.
    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        (self.requests > 0).then(|| self.interval / self.requests)
    }
}

/// Non-balance subscriptions, plus one for the batched balance query.
#[must_use]
pub fn request_count(polling: &BTreeSet<Subscription>) -> u32 {
    let (balances, others): (Vec<_>, Vec<_>) = polling
        .iter()
        .partition(|s| s.kind() == FeedKind::Balance);
    let count = others.len() + usize::from(!balances.is_empty());
    u32::try_from(count).unwrap_or(u32::MAX)
}
