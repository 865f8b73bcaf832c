//! Events emitted by the fallback service.

use std::time::Instant;
use tower_guard_core::ResilienceEvent;

/// Events emitted by the fallback service.
#[derive(Debug, Clone)]
pub enum FallbackEvent {
    /// The inner service succeeded; no fallback was needed.
    Success {
        /// Name of the fallback instance.
        guard_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },

    /// A handler matched the error and produced a substitute value.
    Applied {
        /// Name of the fallback instance.
        guard_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Name of the handler that matched.
        handler: String,
    },

    /// No handler matched; the error was propagated as-is.
    Skipped {
        /// Name of the fallback instance.
        guard_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
}

impl ResilienceEvent for FallbackEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Applied { .. } => "applied",
            Self::Skipped { .. } => "skipped",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::Success { timestamp, .. }
            | Self::Applied { timestamp, .. }
            | Self::Skipped { timestamp, .. } => *timestamp,
        }
    }

    fn guard_name(&self) -> &str {
        match self {
            Self::Success { guard_name, .. }
            | Self::Applied { guard_name, .. }
            | Self::Skipped { guard_name, .. } => guard_name,
        }
    }
}
