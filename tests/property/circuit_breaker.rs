//! Property tests for the circuit breaker.
//!
//! Invariants tested:
//! - The sliding window holds the last `capacity` outcomes and counts their failures
//! - A closed circuit opens exactly when a full enough window reaches the threshold
//! - Half-open admits exactly the permitted number of trials
//! - Half-open closes only if every trial succeeds

use proptest::prelude::*;
use std::collections::VecDeque;
use std::time::Duration;
use tower_guard_circuitbreaker::window::{CallOutcome, SlidingWindow};
use tower_guard_circuitbreaker::{CircuitBreakerConfig, CircuitState};

fn outcome(failed: bool) -> CallOutcome {
    if failed {
        CallOutcome::Failure
    } else {
        CallOutcome::Success
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: the window matches the tail of the recorded sequence
    #[test]
    fn window_keeps_the_most_recent_outcomes(
        capacity in 1usize..=20,
        failures in prop::collection::vec(any::<bool>(), 0..100),
    ) {
        let mut window = SlidingWindow::new(capacity);
        for failed in &failures {
            window.record(outcome(*failed));
        }

        let tail: Vec<_> = failures.iter().rev().take(capacity).collect();
        prop_assert_eq!(window.len(), tail.len());
        prop_assert_eq!(window.failures(), tail.iter().filter(|f| ***f).count());
        prop_assert_eq!(window.successes() + window.failures(), window.len());
    }

    /// Property: the circuit opens at the first call where the model says it should
    #[test]
    fn opens_exactly_when_threshold_is_reached(
        window_size in 1usize..=20,
        minimum in 1usize..=20,
        threshold in 1u32..=100,
        failures in prop::collection::vec(any::<bool>(), 1..80),
    ) {
        let breaker = CircuitBreakerConfig::builder()
            .sliding_window_size(window_size)
            .minimum_number_of_calls(minimum)
            .failure_rate_threshold(threshold as f32)
            .wait_duration_in_open_state(Duration::from_secs(3600))
            .build();
        let minimum = minimum.min(window_size);

        let mut model: VecDeque<bool> = VecDeque::new();
        let mut open = false;
        let mut downstream_calls = 0;

        for failed in failures {
            match breaker.try_acquire() {
                Ok(permit) => {
                    prop_assert!(!open, "admitted a call while open");
                    downstream_calls += 1;
                    if failed {
                        permit.record_failure(Duration::ZERO, "down");
                    } else {
                        permit.record_success(Duration::ZERO);
                    }

                    model.push_back(failed);
                    if model.len() > window_size {
                        model.pop_front();
                    }
                    if model.len() >= minimum {
                        let rate = model.iter().filter(|f| **f).count() as f64 / model.len() as f64;
                        open = rate * 100.0 >= f64::from(threshold as f32);
                    }
                }
                Err(_) => prop_assert!(open, "rejected a call while closed"),
            }
            let expected = if open { CircuitState::Open } else { CircuitState::Closed };
            prop_assert_eq!(breaker.state(), expected);
        }
        prop_assert!(downstream_calls >= 1);
    }

    /// Property: no more than the permitted trials are admitted, however many ask
    #[test]
    fn half_open_admits_exactly_the_permitted_trials(
        permitted in 1usize..=10,
        requests in 0usize..=30,
    ) {
        let breaker = CircuitBreakerConfig::builder()
            .permitted_number_of_calls_in_half_open_state(permitted)
            .build();
        breaker.transition_to_open();
        breaker.transition_to_half_open();

        let permits: Vec<_> = (0..requests).filter_map(|_| breaker.try_acquire().ok()).collect();
        prop_assert_eq!(permits.len(), requests.min(permitted));
        prop_assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    /// Property: the verdict is Closed iff every trial succeeded
    #[test]
    fn half_open_verdict_follows_trial_outcomes(
        trials in prop::collection::vec(any::<bool>(), 1..=10),
    ) {
        let breaker = CircuitBreakerConfig::builder()
            .permitted_number_of_calls_in_half_open_state(trials.len())
            .build();
        breaker.transition_to_open();
        breaker.transition_to_half_open();

        let permits: Vec<_> = trials.iter().map(|_| breaker.try_acquire().unwrap()).collect();
        for (permit, failed) in permits.into_iter().zip(&trials) {
            prop_assert_eq!(breaker.state(), CircuitState::HalfOpen);
            if *failed {
                permit.record_failure(Duration::ZERO, "down");
            } else {
                permit.record_success(Duration::ZERO);
            }
        }

        let expected = if trials.iter().any(|f| *f) {
            CircuitState::Open
        } else {
            CircuitState::Closed
        };
        prop_assert_eq!(breaker.state(), expected);
        if expected == CircuitState::Closed {
            prop_assert_eq!(breaker.metrics().buffered_calls, 0);
        }
    }
}
