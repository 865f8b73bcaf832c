use super::*;
use tower::ServiceExt;

#[tokio::test(start_paused = true)]
async fn dropped_call_releases_its_permit() {
    let bulkhead = bulkhead(1, Duration::ZERO);
    let svc = slow(&bulkhead, Duration::from_secs(10));

    let abandoned = tokio::time::timeout(Duration::from_millis(10), svc.clone().oneshot(())).await;
    assert!(abandoned.is_err());

    assert_eq!(bulkhead.available_permits(), 1);
    assert_eq!(bulkhead.in_use(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropped_waiter_takes_nothing() {
    let bulkhead = bulkhead(1, Duration::from_secs(1));
    let held = bulkhead.try_acquire().unwrap();

    let abandoned = tokio::time::timeout(Duration::from_millis(10), bulkhead.acquire()).await;
    assert!(abandoned.is_err());
    assert_eq!(bulkhead.available_permits(), 0);

    drop(held);
    assert_eq!(bulkhead.available_permits(), 1);
    let permit = bulkhead.try_acquire().unwrap();
    permit.finish();
    assert_eq!(bulkhead.available_permits(), 1);
}

#[tokio::test(start_paused = true)]
async fn spawned_call_aborted_mid_flight_releases_its_permit() {
    let bulkhead = bulkhead(2, Duration::ZERO);
    let svc = slow(&bulkhead, Duration::from_secs(10));

    let running = tokio::spawn(svc.clone().oneshot(()));
    tokio::task::yield_now().await;
    assert_eq!(bulkhead.in_use(), 1);

    running.abort();
    assert!(running.await.unwrap_err().is_cancelled());
    assert_eq!(bulkhead.in_use(), 0);
}
