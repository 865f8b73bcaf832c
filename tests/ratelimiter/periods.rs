use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tower::{service_fn, Layer, ServiceExt};
use tower_guard_core::ResilienceError;
use tower_guard_ratelimiter::RateLimiterError;

type TestError = ResilienceError<&'static str>;

#[tokio::test(start_paused = true)]
async fn third_call_in_a_second_is_rejected_then_replenished() {
    let limiter = limiter(2, Duration::from_secs(1), Duration::ZERO);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let svc = limiter.layer().layer(service_fn(move |()| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, TestError>("OK") }
    }));

    assert_eq!(svc.clone().oneshot(()).await, Ok("OK"));
    assert_eq!(svc.clone().oneshot(()).await, Ok("OK"));
    let err = svc.clone().oneshot(()).await.unwrap_err();
    assert!(err.is_rate_limited(), "unexpected error: {err}");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(limiter.available_permissions(), 2);
    assert_eq!(svc.clone().oneshot(()).await, Ok("OK"));
}

#[tokio::test(start_paused = true)]
async fn rejection_reports_time_until_refresh() {
    let limiter = limiter(1, Duration::from_secs(1), Duration::ZERO);
    limiter.acquire_permission().await.unwrap();

    tokio::time::advance(Duration::from_millis(300)).await;
    match limiter.acquire_permission().await {
        Err(RateLimiterError::RequestNotPermitted { name, retry_after }) => {
            assert_eq!(name, "downstreamA");
            assert_eq!(retry_after, Duration::from_millis(700));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn caller_waits_for_next_period_within_timeout() {
    let limiter = limiter(1, Duration::from_millis(100), Duration::from_millis(500));
    limiter.acquire_permission().await.unwrap();

    let start = Instant::now();
    let waited = limiter.acquire_permission().await.unwrap();
    assert_eq!(waited, Duration::from_millis(100));
    assert_eq!(start.elapsed(), Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn caller_is_rejected_when_timeout_ends_before_next_period() {
    let limiter = limiter(1, Duration::from_secs(1), Duration::from_millis(500));
    limiter.acquire_permission().await.unwrap();

    let start = Instant::now();
    let result = limiter.acquire_permission().await;
    assert_eq!(start.elapsed(), Duration::from_millis(500));
    match result {
        Err(RateLimiterError::RequestNotPermitted { retry_after, .. }) => {
            assert_eq!(retry_after, Duration::from_millis(500));
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    tokio::time::advance(Duration::from_millis(500)).await;
    assert_eq!(limiter.available_permissions(), 1);
}

#[tokio::test(start_paused = true)]
async fn never_grants_more_than_the_limit_per_period() {
    let limiter = limiter(5, Duration::from_secs(1), Duration::ZERO);

    for _period in 0..4 {
        let mut granted = 0;
        for _ in 0..20 {
            if limiter.acquire_permission().await.is_ok() {
                granted += 1;
            }
        }
        assert_eq!(granted, 5);
        tokio::time::advance(Duration::from_secs(1)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn events_report_acquired_and_rejected() {
    let acquired = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));
    let (a, r) = (Arc::clone(&acquired), Arc::clone(&rejected));
    let limiter = RateLimiterConfig::builder()
        .limit_for_period(2)
        .limit_refresh_period(Duration::from_secs(1))
        .timeout_duration(Duration::ZERO)
        .on_permit_acquired(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        })
        .on_permit_rejected(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    for _ in 0..3 {
        let _ = limiter.acquire_permission().await;
    }
    assert_eq!(acquired.load(Ordering::SeqCst), 2);
    assert_eq!(rejected.load(Ordering::SeqCst), 1);
}
