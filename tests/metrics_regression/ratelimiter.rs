use super::helpers::*;
use serial_test::serial;
use std::time::Duration;
use tower_guard_ratelimiter::RateLimiterConfig;

#[tokio::test(start_paused = true)]
#[serial]
async fn ratelimiter_metrics_exist() {
    init_recorder();

    let limiter = RateLimiterConfig::builder()
        .name("metrics_limiter")
        .limit_for_period(1)
        .limit_refresh_period(Duration::from_secs(1))
        .timeout_duration(Duration::ZERO)
        .build();

    let _ = limiter.acquire_permission().await;
    let _ = limiter.acquire_permission().await;

    assert_counter_exists("ratelimiter_calls_total");
    assert_metric_has_label("ratelimiter_calls_total", "ratelimiter", "metrics_limiter");
    assert_metric_has_label("ratelimiter_calls_total", "result", "permitted");
    assert_metric_has_label("ratelimiter_calls_total", "result", "rejected");
}
