use crate::CircuitState;
use thiserror::Error;
use tower_guard_core::ResilienceError;

/// Rejection returned when the circuit breaker does not admit a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitBreakerError {
    /// The circuit is open, or its half-open trial quota is used up.
    #[error("circuit breaker '{name}' is {state:?} and does not permit further calls")]
    CallNotPermitted {
        /// Circuit breaker name.
        name: String,
        /// State the call was rejected in.
        state: CircuitState,
    },
}

impl CircuitBreakerError {
    /// Name of the breaker that rejected the call.
    pub fn name(&self) -> &str {
        match self {
            CircuitBreakerError::CallNotPermitted { name, .. } => name,
        }
    }
}

impl<E> From<CircuitBreakerError> for ResilienceError<E> {
    fn from(err: CircuitBreakerError) -> Self {
        match err {
            CircuitBreakerError::CallNotPermitted { name, .. } => {
                ResilienceError::CallNotPermitted { name }
            }
        }
    }
}

/// Invalid circuit breaker settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The sliding window must hold at least one outcome.
    #[error("sliding window size must be at least 1")]
    InvalidWindowSize,

    /// The threshold must lie in (0, 100].
    #[error("failure rate threshold must be in (0, 100], got {0}")]
    InvalidFailureRateThreshold(f32),

    /// At least one trial call must be allowed in half-open.
    #[error("permitted number of calls in half-open state must be at least 1")]
    InvalidPermittedCallsInHalfOpen,
}
