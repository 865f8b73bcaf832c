mod periods;

use std::time::Duration;
use tower_guard_ratelimiter::{RateLimiter, RateLimiterConfig};

pub(crate) fn limiter(limit: usize, period: Duration, timeout: Duration) -> RateLimiter {
    RateLimiterConfig::builder()
        .name("downstreamA")
        .limit_for_period(limit)
        .limit_refresh_period(period)
        .timeout_duration(timeout)
        .build()
}
