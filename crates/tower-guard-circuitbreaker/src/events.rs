use crate::CircuitState;
use std::time::{Duration, Instant};
use tower_guard_core::ResilienceEvent;

/// Events emitted by the circuit breaker.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// A call was admitted.
    CallPermitted {
        guard_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A call was short-circuited without reaching the downstream.
    CallRejected {
        guard_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// The circuit breaker transitioned between states.
    StateTransition {
        guard_name: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// A successful call was recorded.
    SuccessRecorded {
        guard_name: String,
        timestamp: Instant,
        state: CircuitState,
        elapsed: Duration,
    },
    /// A failed call was recorded.
    FailureRecorded {
        guard_name: String,
        timestamp: Instant,
        state: CircuitState,
        elapsed: Duration,
        error: String,
    },
}

impl ResilienceEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::CallPermitted { .. } => "call_permitted",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn guard_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::CallPermitted { guard_name, .. }
            | CircuitBreakerEvent::CallRejected { guard_name, .. }
            | CircuitBreakerEvent::StateTransition { guard_name, .. }
            | CircuitBreakerEvent::SuccessRecorded { guard_name, .. }
            | CircuitBreakerEvent::FailureRecorded { guard_name, .. } => guard_name,
        }
    }
}
