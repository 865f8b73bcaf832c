use std::time::{Duration, Instant};
use tower_guard_core::events::ResilienceEvent;

/// Events emitted by the retry middleware.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// Attempt `attempt` failed with a retryable error; the next one starts after `delay`.
    Retry {
        guard_name: String,
        timestamp: Instant,
        attempt: usize,
        delay: Duration,
    },
    /// The call succeeded after `attempts` attempts.
    Success {
        guard_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The call failed on its last allowed attempt.
    Error {
        guard_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The call failed with an error the predicate does not retry.
    IgnoredError {
        guard_name: String,
        timestamp: Instant,
        attempts: usize,
    },
}

impl ResilienceEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Error { .. } => "error",
            RetryEvent::IgnoredError { .. } => "ignored_error",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Error { timestamp, .. }
            | RetryEvent::IgnoredError { timestamp, .. } => *timestamp,
        }
    }

    fn guard_name(&self) -> &str {
        match self {
            RetryEvent::Retry { guard_name, .. }
            | RetryEvent::Success { guard_name, .. }
            | RetryEvent::Error { guard_name, .. }
            | RetryEvent::IgnoredError { guard_name, .. } => guard_name,
        }
    }
}
