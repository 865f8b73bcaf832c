use std::time::{Duration, Instant};
use tower_guard_core::ResilienceEvent;

/// Events emitted by the bulkhead.
#[derive(Debug, Clone)]
pub enum BulkheadEvent {
    /// A permit was handed out.
    CallPermitted {
        guard_name: String,
        timestamp: Instant,
        concurrent_calls: usize,
    },
    /// No permit was available in time.
    CallRejected {
        guard_name: String,
        timestamp: Instant,
        max_concurrent_calls: usize,
    },
    /// A guarded call completed successfully and released its permit.
    CallFinished {
        guard_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// A guarded call failed and released its permit.
    CallFailed {
        guard_name: String,
        timestamp: Instant,
        duration: Duration,
    },
}

impl ResilienceEvent for BulkheadEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BulkheadEvent::CallPermitted { .. } => "call_permitted",
            BulkheadEvent::CallRejected { .. } => "call_rejected",
            BulkheadEvent::CallFinished { .. } => "call_finished",
            BulkheadEvent::CallFailed { .. } => "call_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            BulkheadEvent::CallPermitted { timestamp, .. }
            | BulkheadEvent::CallRejected { timestamp, .. }
            | BulkheadEvent::CallFinished { timestamp, .. }
            | BulkheadEvent::CallFailed { timestamp, .. } => *timestamp,
        }
    }

    fn guard_name(&self) -> &str {
        match self {
            BulkheadEvent::CallPermitted { guard_name, .. }
            | BulkheadEvent::CallRejected { guard_name, .. }
            | BulkheadEvent::CallFinished { guard_name, .. }
            | BulkheadEvent::CallFailed { guard_name, .. } => guard_name,
        }
    }
}
