use std::time::Duration;
use tokio::time::Instant;

/// What a caller should do after asking for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Acquire {
    /// A token was taken.
    Granted,
    /// No token now; the next period starts after this delay, within the timeout.
    WaitFor(Duration),
    /// No token can arrive before the deadline; `retry_after` is the time
    /// until the next refill.
    Rejected { retry_after: Duration },
}

/// Token bucket refilled in full at fixed period boundaries.
///
/// Invariant: `available_permits <= limit_for_period`.
#[derive(Debug)]
pub(crate) struct RateLimiterState {
    limit_for_period: usize,
    refresh_period: Duration,
    available_permits: usize,
    period_start: Instant,
}

impl RateLimiterState {
    pub(crate) fn new(limit_for_period: usize, refresh_period: Duration, now: Instant) -> Self {
        Self {
            limit_for_period,
            refresh_period,
            available_permits: limit_for_period,
            period_start: now,
        }
    }

    /// Takes a token if one is available, else says how long until the next
    /// refill if that is before `deadline`.
    pub(crate) fn try_acquire(&mut self, now: Instant, deadline: Instant) -> Acquire {
        self.refresh_if_elapsed(now);

        if self.available_permits > 0 {
            self.available_permits -= 1;
            return Acquire::Granted;
        }

        let until_refresh = self.time_until_refresh(now);
        if now + until_refresh > deadline {
            Acquire::Rejected {
                retry_after: until_refresh,
            }
        } else {
            Acquire::WaitFor(until_refresh)
        }
    }

    pub(crate) fn available_permits(&mut self, now: Instant) -> usize {
        self.refresh_if_elapsed(now);
        self.available_permits
    }

    fn time_until_refresh(&self, now: Instant) -> Duration {
        self.refresh_period
            .saturating_sub(now.saturating_duration_since(self.period_start))
    }

    fn refresh_if_elapsed(&mut self, now: Instant) {
        if now.saturating_duration_since(self.period_start) >= self.refresh_period {
            self.available_permits = self.limit_for_period;
            self.period_start = now;
        }
    }
}
