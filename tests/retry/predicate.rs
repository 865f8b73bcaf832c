use super::*;
use std::time::Duration;
use tower::{Layer, ServiceExt};
use tower_guard_circuitbreaker::{CircuitBreakerConfig, CircuitState};
use tower_guard_retry::RetryLayer;

fn retry() -> RetryLayer<GuardError> {
    RetryLayer::builder()
        .name("downstreamA")
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(100))
        .retry_on(tower_guard::is_retryable)
        .build()
}

#[tokio::test(start_paused = true)]
async fn client_errors_are_not_retried() {
    let (svc, calls) = scripted(vec![Err(DownstreamError::remote(404, "missing"))]);

    let err = retry().layer(svc).oneshot(()).await.unwrap_err();

    assert_eq!(err.as_application().and_then(DownstreamError::status), Some(404));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn transport_failures_are_retried() {
    let (svc, calls) = scripted(vec![Err(DownstreamError::Transport(
        "connection reset".to_string(),
    ))]);

    assert_eq!(retry().layer(svc).oneshot(()).await, Ok("OK"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn call_not_permitted_is_never_retried() {
    let breaker = CircuitBreakerConfig::builder().name("downstreamA").build();
    breaker.transition_to_open();
    let (svc, calls) = scripted(vec![]);
    let ignored = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ignored);
    let layer = RetryLayer::<GuardError>::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(100))
        .retry_on(tower_guard::is_retryable)
        .on_ignored_error(move |attempts| counter.store(attempts, Ordering::SeqCst))
        .build();

    let guarded = layer.layer(breaker.layer().layer(svc));
    let err = guarded.oneshot(()).await.unwrap_err();

    assert!(err.is_call_not_permitted());
    assert_eq!(ignored.load(Ordering::SeqCst), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn breaker_opening_mid_retry_ends_the_loop() {
    let breaker = CircuitBreakerConfig::builder()
        .name("downstreamA")
        .sliding_window_size(2)
        .wait_duration_in_open_state(Duration::from_secs(5))
        .build();
    let (svc, calls) = scripted(vec![unavailable(), unavailable(), unavailable()]);

    let guarded = retry().layer(breaker.layer().layer(svc));
    let err = guarded.oneshot(()).await.unwrap_err();

    // Two attempts fill the window and open it; the third is short-circuited
    assert!(err.is_call_not_permitted());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn every_attempt_is_recorded_by_the_breaker() {
    let breaker = CircuitBreakerConfig::builder()
        .name("downstreamA")
        .sliding_window_size(10)
        .build();
    let (svc, _calls) = scripted(vec![unavailable(), unavailable()]);

    let guarded = retry().layer(breaker.layer().layer(svc));
    assert_eq!(guarded.oneshot(()).await, Ok("OK"));

    let metrics = breaker.metrics();
    assert_eq!(metrics.buffered_calls, 3);
    assert_eq!(metrics.failed_calls, 2);
    assert_eq!(metrics.successful_calls, 1);
}
