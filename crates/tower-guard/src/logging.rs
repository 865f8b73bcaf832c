//! An event sink that turns guard events into log lines.
//!
//! Circuit breaker events produce the familiar one-line summaries:
//!
//! ```text
//! CB downstreamA -> CLOSED_TO_OPEN
//! CB downstreamA SHORT-CIRCUIT
//! CB downstreamA ERROR: application error: downstream returned status 503 (12 ms)
//! CB downstreamA SUCCESS (3 ms)
//! ```
//!
//! Events from the other guards are logged at debug level.

use std::sync::Arc;
use tower_guard_bulkhead::BulkheadEvent;
use tower_guard_circuitbreaker::CircuitBreakerEvent;
use tower_guard_core::EventListener;
use tower_guard_fallback::FallbackEvent;
use tower_guard_ratelimiter::RateLimiterEvent;
use tower_guard_retry::RetryEvent;
use tracing::Level;

/// Logs guard events through `tracing`.
///
/// One instance can be attached to every guard in a registry:
///
/// ```rust
/// use tower_guard::LoggingListener;
/// use tower_guard_circuitbreaker::CircuitBreakerConfig;
///
/// let breaker = CircuitBreakerConfig::builder()
///     .name("downstreamA")
///     .event_listener(LoggingListener::shared())
///     .build();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl LoggingListener {
    /// A shared handle ready to pass to any guard's `event_listener`.
    pub fn shared() -> Arc<Self> {
        Arc::new(LoggingListener)
    }

    /// The log line for a circuit breaker event, if it has one.
    pub fn circuit_breaker_line(event: &CircuitBreakerEvent) -> Option<(Level, String)> {
        match event {
            CircuitBreakerEvent::StateTransition {
                guard_name,
                from_state,
                to_state,
                ..
            } => Some((
                Level::INFO,
                format!("CB {guard_name} -> {from_state}_TO_{to_state}"),
            )),
            CircuitBreakerEvent::CallRejected { guard_name, .. } => {
                Some((Level::WARN, format!("CB {guard_name} SHORT-CIRCUIT")))
            }
            CircuitBreakerEvent::FailureRecorded {
                guard_name,
                elapsed,
                error,
                ..
            } => Some((
                Level::WARN,
                format!(
                    "CB {guard_name} ERROR: {error} ({} ms)",
                    elapsed.as_millis()
                ),
            )),
            CircuitBreakerEvent::SuccessRecorded {
                guard_name,
                elapsed,
                ..
            } => Some((
                Level::INFO,
                format!("CB {guard_name} SUCCESS ({} ms)", elapsed.as_millis()),
            )),
            CircuitBreakerEvent::CallPermitted { .. } => None,
        }
    }
}

fn log(level: Level, line: &str) {
    if level == Level::WARN {
        tracing::warn!("{line}");
    } else if level == Level::INFO {
        tracing::info!("{line}");
    } else {
        tracing::debug!("{line}");
    }
}

impl EventListener<CircuitBreakerEvent> for LoggingListener {
    fn on_event(&self, event: &CircuitBreakerEvent) {
        if let Some((level, line)) = Self::circuit_breaker_line(event) {
            log(level, &line);
        }
    }
}

impl EventListener<RetryEvent> for LoggingListener {
    fn on_event(&self, event: &RetryEvent) {
        match event {
            RetryEvent::Retry {
                guard_name,
                attempt,
                delay,
                ..
            } => tracing::debug!(
                "RETRY {guard_name} attempt {attempt} failed, next in {} ms",
                delay.as_millis()
            ),
            RetryEvent::Error {
                guard_name,
                attempts,
                ..
            } => tracing::debug!("RETRY {guard_name} gave up after {attempts} attempts"),
            _ => {}
        }
    }
}

impl EventListener<BulkheadEvent> for LoggingListener {
    fn on_event(&self, event: &BulkheadEvent) {
        if let BulkheadEvent::CallRejected {
            guard_name,
            max_concurrent_calls,
            ..
        } = event
        {
            tracing::debug!("BULKHEAD {guard_name} FULL ({max_concurrent_calls} concurrent calls)");
        }
    }
}

impl EventListener<RateLimiterEvent> for LoggingListener {
    fn on_event(&self, event: &RateLimiterEvent) {
        if let RateLimiterEvent::PermitRejected { guard_name, .. } = event {
            tracing::debug!("RATELIMITER {guard_name} REJECTED");
        }
    }
}

impl EventListener<FallbackEvent> for LoggingListener {
    fn on_event(&self, event: &FallbackEvent) {
        if let FallbackEvent::Applied {
            guard_name,
            handler,
            ..
        } = event
        {
            tracing::debug!("FALLBACK {guard_name} applied ({handler})");
        }
    }
}
