use thiserror::Error;
use tower_guard_core::ResilienceError;

/// A failure reported by the downstream service or the transport to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownstreamError {
    /// The request never produced a response (connection refused, reset, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The downstream answered with a non-success status.
    #[error("downstream returned status {status}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body, uninterpreted.
        body: String,
    },
}

impl DownstreamError {
    /// Shorthand for a [`DownstreamError::Remote`] response.
    pub fn remote(status: u16, body: impl Into<String>) -> Self {
        DownstreamError::Remote {
            status,
            body: body.into(),
        }
    }

    /// The response status, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            DownstreamError::Remote { status, .. } => Some(*status),
            DownstreamError::Transport(_) => None,
        }
    }

    /// Returns true if no response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, DownstreamError::Transport(_))
    }

    /// Returns true for 5xx responses.
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(500..=599))
    }

    /// Transport failures and 5xx responses are worth another attempt.
    /// Client errors (4xx) are not.
    pub fn is_retryable(&self) -> bool {
        self.is_transport() || self.is_server_error()
    }
}

/// Error returned by a guarded call: a guard rejection or the downstream's own failure.
pub type GuardError = ResilienceError<DownstreamError>;

/// Retry predicate for guarded calls.
///
/// Only retryable downstream failures qualify. Guard rejections such as
/// `CallNotPermitted` are never retried.
pub fn is_retryable(error: &GuardError) -> bool {
    error.as_application().is_some_and(DownstreamError::is_retryable)
}
