use super::helpers::*;
use serial_test::serial;
use std::time::Duration;
use tower::{service_fn, Layer, ServiceExt};
use tower_guard_bulkhead::BulkheadConfig;
use tower_guard_core::ResilienceError;

#[tokio::test(start_paused = true)]
#[serial]
async fn bulkhead_metrics_exist() {
    init_recorder();

    let bulkhead = BulkheadConfig::builder()
        .name("metrics_bulkhead")
        .max_concurrent_calls(1)
        .build();
    let svc = bulkhead.layer().layer(service_fn(|()| async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, ResilienceError<()>>(())
    }));

    let running = tokio::spawn(svc.clone().oneshot(()));
    tokio::task::yield_now().await;
    let _ = svc.clone().oneshot(()).await;
    running.await.unwrap().unwrap();

    assert_counter_exists("bulkhead_calls_permitted_total");
    assert_metric_has_label("bulkhead_calls_permitted_total", "bulkhead", "metrics_bulkhead");
    assert_counter_exists("bulkhead_calls_rejected_total");
    assert_gauge_exists("bulkhead_concurrent_calls");
}
