//! Error types for the bulkhead pattern.

use std::time::Duration;
use tower_guard_core::ResilienceError;

/// Rejections returned by a bulkhead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkheadError {
    /// Every permit was in use and the bulkhead does not wait.
    #[error("bulkhead '{name}' is full: max concurrent calls ({max_concurrent_calls}) reached")]
    BulkheadFull {
        /// Bulkhead name.
        name: String,
        /// Maximum concurrent calls allowed.
        max_concurrent_calls: usize,
    },
    /// No permit was released within the maximum wait.
    #[error("bulkhead '{name}' is full: no permit released within {max_wait:?}")]
    Timeout {
        /// Bulkhead name.
        name: String,
        /// Maximum concurrent calls allowed.
        max_concurrent_calls: usize,
        /// How long the caller waited.
        max_wait: Duration,
    },
}

impl BulkheadError {
    /// Name of the bulkhead that rejected the call.
    pub fn name(&self) -> &str {
        match self {
            BulkheadError::BulkheadFull { name, .. } | BulkheadError::Timeout { name, .. } => name,
        }
    }
}

// A timed-out wait is reported as `BulkheadFull` too.
impl<E> From<BulkheadError> for ResilienceError<E> {
    fn from(err: BulkheadError) -> Self {
        match err {
            BulkheadError::BulkheadFull {
                name,
                max_concurrent_calls,
            }
            | BulkheadError::Timeout {
                name,
                max_concurrent_calls,
                ..
            } => ResilienceError::BulkheadFull {
                name,
                max_concurrent_calls,
            },
        }
    }
}

/// Invalid bulkhead settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// At least one concurrent call must be allowed.
    #[error("max concurrent calls must be at least 1")]
    InvalidMaxConcurrentCalls,
    /// More concurrent calls than a semaphore can hold.
    #[error("max concurrent calls {requested} exceeds the limit of {max}")]
    TooManyConcurrentCalls { requested: usize, max: usize },
}
