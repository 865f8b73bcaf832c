use super::*;
use std::time::Duration;
use tower_guard::{GuardError, GuardSettings, ResilienceRegistry};
use tower_guard_circuitbreaker::{CircuitBreakerEvent, CircuitState};
use tower_guard_core::{EventListener, ResilienceError};
use tower_guard_fallback::{FallbackLayer, Outcome};
use tower_guard_retry::RetryEvent;

fn registry() -> ResilienceRegistry {
    ResilienceRegistry::builder()
        .with_settings(&GuardSettings::downstream_a(), None)
        .unwrap()
        .build()
}

fn fallback_on_server_error() -> FallbackLayer<String, GuardError> {
    FallbackLayer::<String, GuardError>::builder()
        .value_on(
            "server-error",
            |e: &GuardError| e.as_application().is_some_and(DownstreamError::is_server_error),
            "FALLBACK".to_string(),
        )
        .value_on("call-not-permitted", GuardError::is_call_not_permitted, "FALLBACK".to_string())
        .build()
}

#[tokio::test(start_paused = true)]
async fn recovers_within_the_attempt_budget() {
    let registry = registry();
    let call = registry.retry_path::<String>("downstreamA").unwrap();
    let script = Script::new(vec![unavailable(), unavailable()]);

    let outcome = call.call(script.op()).await.unwrap();

    assert_eq!(outcome, Outcome::Primary("OK".to_string()));
    assert_eq!(script.calls(), 3);
    let metrics = registry.circuit_breaker("downstreamA").unwrap().metrics();
    assert_eq!(metrics.failed_calls, 2);
    assert_eq!(metrics.successful_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_fall_back() {
    let registry = registry();
    let call = registry
        .retry_path::<String>("downstreamA")
        .unwrap()
        .with_fallback(fallback_on_server_error());
    let script = Script::new(vec![unavailable(), unavailable(), unavailable()]);

    let outcome = call.call(script.op()).await.unwrap();

    assert_eq!(outcome, Outcome::Degraded("FALLBACK".to_string()));
    assert_eq!(script.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn unmatched_error_propagates_past_the_fallback() {
    let registry = registry();
    let call = registry
        .retry_path::<String>("downstreamA")
        .unwrap()
        .with_fallback(fallback_on_server_error());
    let script = Script::new(vec![Err(DownstreamError::remote(404, "missing"))]);

    let err = call.call(script.op()).await.unwrap_err();

    assert_eq!(
        err,
        ResilienceError::Application(DownstreamError::remote(404, "missing"))
    );
    assert_eq!(script.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn open_breaker_short_circuits_every_attempt() {
    let registry = registry();
    let call = registry.retry_path::<String>("downstreamA").unwrap();
    registry
        .circuit_breaker("downstreamA")
        .unwrap()
        .transition_to_open();
    let script = Script::default();

    let err = call.call(script.op()).await.unwrap_err();

    assert!(err.is_call_not_permitted());
    assert_eq!(script.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn calls_from_one_registry_share_the_breaker() {
    let registry = registry();
    let first = registry.retry_path::<String>("downstreamA").unwrap();
    let second = registry.retry_path::<String>("downstreamA").unwrap();
    let failing = Script::new(vec![unavailable(); 12]);

    // 3 + 3 + 3 + 1 attempts fill the window; the 10th failure opens it
    for _ in 0..4 {
        let _ = first.call(failing.op()).await;
    }
    assert_eq!(failing.calls(), 10);
    assert_eq!(
        registry.circuit_breaker("downstreamA").unwrap().state(),
        CircuitState::Open
    );

    let healthy = Script::default();
    assert!(second.call(healthy.op()).await.unwrap_err().is_call_not_permitted());
    assert_eq!(healthy.calls(), 0);
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<&'static str>>,
}

impl EventListener<CircuitBreakerEvent> for Recorder {
    fn on_event(&self, event: &CircuitBreakerEvent) {
        use tower_guard_core::ResilienceEvent;
        self.events.lock().unwrap().push(event.event_type());
    }
}

impl EventListener<RetryEvent> for Recorder {
    fn on_event(&self, event: &RetryEvent) {
        use tower_guard_core::ResilienceEvent;
        self.events.lock().unwrap().push(event.event_type());
    }
}

#[tokio::test(start_paused = true)]
async fn one_sink_observes_every_guard_in_order() {
    let recorder = Arc::new(Recorder::default());
    let breaker = tower_guard_circuitbreaker::CircuitBreakerConfig::builder()
        .name("downstreamA")
        .sliding_window_size(10)
        .event_listener(recorder.clone())
        .build();
    let retry = tower_guard_retry::RetryLayer::<GuardError>::builder()
        .name("downstreamA")
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(10))
        .retry_on(tower_guard::is_retryable)
        .event_listener(recorder.clone())
        .build();
    let call = tower_guard::GuardedCall::<String>::retry_path(retry, breaker);
    let script = Script::new(vec![unavailable()]);

    call.call(script.op()).await.unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            "call_permitted",
            "failure_recorded",
            "retry",
            "call_permitted",
            "success_recorded",
            "success",
        ]
    );
}
