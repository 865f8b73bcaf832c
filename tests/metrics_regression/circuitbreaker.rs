use super::helpers::*;
use serial_test::serial;
use std::time::Duration;
use tower::{service_fn, Layer, ServiceExt};
use tower_guard_circuitbreaker::CircuitBreakerConfig;
use tower_guard_core::ResilienceError;

#[tokio::test]
#[serial]
async fn circuitbreaker_metrics_exist() {
    init_recorder();

    let breaker = CircuitBreakerConfig::builder()
        .name("metrics_cb")
        .sliding_window_size(4)
        .minimum_number_of_calls(2)
        .failure_rate_threshold(50.0)
        .wait_duration_in_open_state(Duration::from_secs(60))
        .build();
    let svc = breaker.layer().layer(service_fn(|fail: bool| async move {
        if fail {
            Err(ResilienceError::Application("failure"))
        } else {
            Ok("success")
        }
    }));

    for fail in [false, true, true, false] {
        let _ = svc.clone().oneshot(fail).await;
    }

    assert_counter_exists("circuitbreaker_calls_total");
    assert_metric_has_label("circuitbreaker_calls_total", "circuitbreaker", "metrics_cb");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "success");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "failure");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "rejected");

    assert_counter_exists("circuitbreaker_transitions_total");
    assert_metric_has_label("circuitbreaker_transitions_total", "from", "CLOSED");
    assert_metric_has_label("circuitbreaker_transitions_total", "to", "OPEN");

    assert_gauge_exists("circuitbreaker_state");
    assert_metric_has_label("circuitbreaker_state", "circuitbreaker", "metrics_cb");

    assert_histogram_exists("circuitbreaker_call_duration_seconds");
}
