use super::*;
use futures::future::join_all;
use std::time::Duration;
use tower_guard::{GuardSettings, ResilienceRegistry};
use tower_guard_fallback::Outcome;

fn registry() -> ResilienceRegistry {
    ResilienceRegistry::builder()
        .with_settings(&GuardSettings::downstream_a(), None)
        .unwrap()
        .build()
}

#[tokio::test(start_paused = true)]
async fn third_concurrent_call_is_rejected_by_the_bulkhead() {
    let registry = registry();
    let call = registry.admission_path::<String>("downstreamA").unwrap();
    let started = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let call = call.clone();
            let started = Arc::clone(&started);
            tokio::spawn(async move {
                call.call(move || {
                    let started = Arc::clone(&started);
                    async move {
                        started.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok("OK".to_string())
                    }
                })
                .await
            })
        })
        .collect();
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.is_bulkhead_full()))
            .count(),
        1
    );
    assert_eq!(started.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn third_call_in_a_second_is_rate_limited() {
    let registry = registry();
    let call = registry.admission_path::<String>("downstreamA").unwrap();
    let script = Script::default();

    for _ in 0..2 {
        let outcome = call.call(script.op()).await.unwrap();
        assert_eq!(outcome, Outcome::Primary("OK".to_string()));
    }
    let err = call.call(script.op()).await.unwrap_err();

    assert!(err.is_rate_limited(), "unexpected error: {err}");
    assert_eq!(script.calls(), 2);
    // The rejected call gave its bulkhead slot back
    assert_eq!(registry.bulkhead("downstreamA").unwrap().in_use(), 0);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(call.call(script.op()).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn downstream_failure_is_not_retried_or_substituted() {
    let registry = registry();
    let call = registry.admission_path::<String>("downstreamA").unwrap();
    let script = Script::new(vec![unavailable()]);

    let err = call.call(script.op()).await.unwrap_err();

    assert_eq!(err.as_application().and_then(DownstreamError::status), Some(503));
    assert_eq!(script.calls(), 1);
}
