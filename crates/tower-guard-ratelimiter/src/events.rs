use std::time::{Duration, Instant};
use tower_guard_core::events::ResilienceEvent;

/// Events emitted by the rate limiter.
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// A token was taken, possibly after waiting for the next period.
    PermitAcquired {
        guard_name: String,
        timestamp: Instant,
        wait_duration: Duration,
    },
    /// No token was available before the timeout.
    PermitRejected {
        guard_name: String,
        timestamp: Instant,
        timeout_duration: Duration,
    },
}

impl ResilienceEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::PermitAcquired { .. } => "permit_acquired",
            RateLimiterEvent::PermitRejected { .. } => "permit_rejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::PermitAcquired { timestamp, .. }
            | RateLimiterEvent::PermitRejected { timestamp, .. } => *timestamp,
        }
    }

    fn guard_name(&self) -> &str {
        match self {
            RateLimiterEvent::PermitAcquired { guard_name, .. }
            | RateLimiterEvent::PermitRejected { guard_name, .. } => guard_name,
        }
    }
}
