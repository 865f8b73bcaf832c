//! Property tests for retry.
//!
//! Invariants tested:
//! - The operation runs at most `max_attempts` times
//! - Jittered delays stay within the randomization bounds
//! - Exponential delays never shrink

use super::paused_runtime;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::{Layer, ServiceExt};
use tower_guard_retry::{ExponentialBackoff, ExponentialRandomBackoff, IntervalFunction, RetryLayer};

#[derive(Debug, Clone, PartialEq)]
struct Transient;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: attempts = min(failures + 1, max_attempts)
    #[test]
    fn attempts_never_exceed_the_maximum(
        max_attempts in 1usize..=6,
        failures in 0usize..=10,
    ) {
        let rt = paused_runtime();
        let calls = Arc::new(AtomicUsize::new(0));

        let result = rt.block_on(async {
            let counter = Arc::clone(&calls);
            let svc = tower::service_fn(move |()| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move { if n < failures { Err(Transient) } else { Ok(n) } }
            });
            RetryLayer::<Transient>::builder()
                .max_attempts(max_attempts)
                .exponential_random_backoff(Duration::from_millis(200), 2.0, 0.5)
                .build()
                .layer(svc)
                .oneshot(())
                .await
        });

        prop_assert_eq!(calls.load(Ordering::SeqCst), (failures + 1).min(max_attempts));
        prop_assert_eq!(result.is_ok(), failures < max_attempts);
    }

    /// Property: jitter keeps the delay within d * (1 ± f)
    #[test]
    fn jittered_delay_within_bounds(
        initial_ms in 1u64..=1_000,
        factor in 0.0f64..=1.0,
        attempt in 0usize..=6,
    ) {
        let backoff = ExponentialRandomBackoff::new(Duration::from_millis(initial_ms), factor);
        let base = initial_ms as f64 * 2f64.powi(attempt as i32);

        let millis = backoff.next_interval(attempt).as_secs_f64() * 1_000.0;
        prop_assert!(millis >= base * (1.0 - factor) - 1e-3, "{} < lower bound", millis);
        prop_assert!(millis <= base * (1.0 + factor) + 1e-3, "{} > upper bound", millis);
    }

    /// Property: with a multiplier of at least 1 the delay never shrinks
    #[test]
    fn exponential_delay_is_monotonic(
        initial_ms in 1u64..=1_000,
        multiplier in 1.0f64..=4.0,
    ) {
        let backoff = ExponentialBackoff::new(Duration::from_millis(initial_ms)).multiplier(multiplier);
        for attempt in 0..8 {
            prop_assert!(backoff.next_interval(attempt + 1) >= backoff.next_interval(attempt));
        }
    }
}
