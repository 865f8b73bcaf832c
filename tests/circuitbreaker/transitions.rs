use super::*;
use std::sync::Mutex;

#[tokio::test]
async fn opens_once_window_reaches_threshold() {
    let breaker = breaker("threshold");
    let downstream = Downstream::default();
    let svc = downstream.guarded(&breaker);

    for _ in 0..5 {
        assert_eq!(call(&svc).await, Ok("OK"));
    }
    downstream.fail(true);
    for _ in 0..4 {
        assert_eq!(call(&svc).await, Err(ResilienceError::Application("down")));
    }
    // 9 outcomes, below the minimum
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.metrics().failure_rate, None);

    assert!(call(&svc).await.is_err());
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(downstream.calls(), 10);
}

#[tokio::test]
async fn open_circuit_never_reaches_downstream() {
    let breaker = breaker("short-circuit");
    let downstream = Downstream::default();
    let svc = downstream.guarded(&breaker);
    trip(&breaker, &downstream, &svc).await;

    for _ in 0..20 {
        let err = call(&svc).await.unwrap_err();
        assert!(err.is_call_not_permitted(), "unexpected error: {err}");
    }
    assert_eq!(downstream.calls(), 10);
}

#[tokio::test]
async fn oldest_outcomes_leave_the_window() {
    let breaker = breaker("eviction");
    let downstream = Downstream::default();
    let svc = downstream.guarded(&breaker);

    downstream.fail(true);
    for _ in 0..4 {
        let _ = call(&svc).await;
    }
    downstream.fail(false);
    for _ in 0..10 {
        call(&svc).await.unwrap();
    }
    let metrics = breaker.metrics();
    assert_eq!(metrics.buffered_calls, 10);
    assert_eq!(metrics.failed_calls, 0);

    downstream.fail(true);
    for _ in 0..4 {
        let _ = call(&svc).await;
    }
    let rate = breaker.metrics().failure_rate.unwrap();
    assert!((rate - 40.0).abs() < 0.01, "rate was {rate}");
    assert_eq!(breaker.state(), CircuitState::Closed);

    let _ = call(&svc).await;
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn admits_first_call_once_open_wait_elapses() {
    let breaker = breaker("open-wait");
    let downstream = Downstream::default();
    let svc = downstream.guarded(&breaker);
    trip(&breaker, &downstream, &svc).await;

    tokio::time::advance(Duration::from_millis(4_999)).await;
    assert!(call(&svc).await.unwrap_err().is_call_not_permitted());
    assert_eq!(downstream.calls(), 10);

    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(call(&svc).await, Ok("OK"));
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    assert_eq!(downstream.calls(), 11);
}

#[tokio::test(start_paused = true)]
async fn state_queries_do_not_transition() {
    let breaker = breaker("idempotent");
    let downstream = Downstream::default();
    let svc = downstream.guarded(&breaker);
    trip(&breaker, &downstream, &svc).await;

    tokio::time::advance(Duration::from_secs(60)).await;
    for _ in 0..100 {
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(breaker.is_open());
        assert_eq!(breaker.metrics().state, CircuitState::Open);
    }
}

#[tokio::test(start_paused = true)]
async fn automatic_transition_moves_to_half_open() {
    let breaker = CircuitBreakerConfig::builder()
        .name("automatic")
        .sliding_window_size(2)
        .wait_duration_in_open_state(Duration::from_secs(5))
        .automatic_transition_from_open_to_half_open_enabled(true)
        .build();

    breaker.transition_to_open();
    tokio::time::sleep(Duration::from_millis(5_001)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
}

#[tokio::test(start_paused = true)]
async fn automatic_timer_ignores_superseded_open_state() {
    let breaker = CircuitBreakerConfig::builder()
        .name("superseded")
        .sliding_window_size(2)
        .wait_duration_in_open_state(Duration::from_secs(5))
        .automatic_transition_from_open_to_half_open_enabled(true)
        .build();

    breaker.transition_to_open();
    breaker.transition_to_closed();
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn transitions_are_published_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let breaker = CircuitBreakerConfig::builder()
        .name("events")
        .sliding_window_size(2)
        .wait_duration_in_open_state(Duration::from_secs(1))
        .permitted_number_of_calls_in_half_open_state(1)
        .on_state_transition(move |from, to| sink.lock().unwrap().push((from, to)))
        .build();
    let downstream = Downstream::default();
    let svc = downstream.guarded(&breaker);

    trip(&breaker, &downstream, &svc).await;
    tokio::time::advance(Duration::from_secs(1)).await;
    call(&svc).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (CircuitState::Closed, CircuitState::Open),
            (CircuitState::Open, CircuitState::HalfOpen),
            (CircuitState::HalfOpen, CircuitState::Closed),
        ]
    );
}

#[tokio::test]
async fn forcing_the_current_state_is_a_no_op() {
    let transitions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&transitions);
    let breaker = CircuitBreakerConfig::builder()
        .on_state_transition(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    breaker.transition_to_closed();
    breaker.transition_to_open();
    breaker.transition_to_open();
    assert_eq!(transitions.load(Ordering::SeqCst), 1);
}
