use super::*;

async fn half_open(name: &str) -> (CircuitBreaker, Downstream, Guarded) {
    let breaker = breaker(name);
    let downstream = Downstream::default();
    let svc = downstream.guarded(&breaker);
    trip(&breaker, &downstream, &svc).await;
    breaker.transition_to_half_open();
    (breaker, downstream, svc)
}

#[tokio::test]
async fn admits_exactly_the_permitted_trials() {
    let (breaker, _downstream, _svc) = half_open("quota").await;

    let permits: Vec<_> = (0..3).map(|_| breaker.try_acquire().unwrap()).collect();
    for _ in 0..5 {
        let err = breaker.try_acquire().unwrap_err();
        assert_eq!(err.name(), "quota");
    }
    assert_eq!(breaker.metrics().half_open_permitted, 3);
    drop(permits);
}

#[tokio::test]
async fn all_trials_succeeding_closes_with_empty_window() {
    let (breaker, downstream, svc) = half_open("close").await;

    for _ in 0..2 {
        call(&svc).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }
    call(&svc).await.unwrap();

    assert_eq!(breaker.state(), CircuitState::Closed);
    let metrics = breaker.metrics();
    assert_eq!(metrics.buffered_calls, 0);
    assert_eq!(metrics.failure_rate, None);
    assert_eq!(downstream.calls(), 13);
}

#[tokio::test]
async fn closed_circuit_needs_a_fresh_minimum_before_reopening() {
    let (breaker, downstream, svc) = half_open("fresh-minimum").await;
    for _ in 0..3 {
        call(&svc).await.unwrap();
    }

    downstream.fail(true);
    for _ in 0..9 {
        let _ = call(&svc).await;
    }
    assert_eq!(breaker.state(), CircuitState::Closed);
    let _ = call(&svc).await;
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test]
async fn any_failed_trial_reopens() {
    let (breaker, downstream, svc) = half_open("reopen").await;

    call(&svc).await.unwrap();
    downstream.fail(true);
    let _ = call(&svc).await;
    // Verdict waits for the last trial
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    downstream.fail(false);
    call(&svc).await.unwrap();

    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn reopening_restarts_the_open_wait() {
    let (breaker, downstream, svc) = half_open("restart-wait").await;

    tokio::time::advance(Duration::from_secs(3)).await;
    downstream.fail(true);
    for _ in 0..3 {
        let _ = call(&svc).await;
    }
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(breaker.metrics().time_since_state_change, Duration::ZERO);
    downstream.fail(false);

    tokio::time::advance(Duration::from_secs(4)).await;
    assert!(call(&svc).await.unwrap_err().is_call_not_permitted());
    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(call(&svc).await, Ok("OK"));
}

#[tokio::test]
async fn rejections_past_the_quota_report_half_open() {
    let rejected_in = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&rejected_in);
    let breaker = CircuitBreakerConfig::builder()
        .permitted_number_of_calls_in_half_open_state(1)
        .on_call_rejected(move |state| sink.lock().unwrap().push(state))
        .build();

    breaker.transition_to_open();
    assert!(breaker.try_acquire().is_err());
    breaker.transition_to_half_open();
    let _trial = breaker.try_acquire().unwrap();
    assert!(breaker.try_acquire().is_err());

    assert_eq!(
        *rejected_in.lock().unwrap(),
        vec![CircuitState::Open, CircuitState::HalfOpen]
    );
}
