//! Property tests for the rate limiter.
//!
//! Invariants tested:
//! - No period grants more than `limit_for_period` tokens
//! - A new period starts with a full bucket

use super::paused_runtime;
use proptest::prelude::*;
use std::time::Duration;
use tower_guard_ratelimiter::RateLimiterConfig;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn grants_at_most_the_limit_per_period(
        limit in 1usize..=20,
        requests in 0usize..=50,
        periods in 1usize..=4,
    ) {
        let rt = paused_runtime();
        let granted_per_period = rt.block_on(async {
            let limiter = RateLimiterConfig::builder()
                .limit_for_period(limit)
                .limit_refresh_period(Duration::from_secs(1))
                .timeout_duration(Duration::ZERO)
                .build();

            let mut granted_per_period = Vec::new();
            for _ in 0..periods {
                let mut granted = 0;
                for _ in 0..requests {
                    if limiter.acquire_permission().await.is_ok() {
                        granted += 1;
                    }
                }
                granted_per_period.push(granted);
                tokio::time::advance(Duration::from_secs(1)).await;
                assert_eq!(limiter.available_permissions(), limit);
            }
            granted_per_period
        });

        for granted in granted_per_period {
            prop_assert_eq!(granted, requests.min(limit));
        }
    }
}
