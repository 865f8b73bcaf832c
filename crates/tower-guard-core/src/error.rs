//! Common error type for tower-guard stacks.
//!
//! [`ResilienceError`] is the error every guard rejection converts into. Each
//! guard crate provides a `From<GuardError> for ResilienceError<E>` impl, and
//! each guard service only requires `S::Error: From<GuardError>`, so a stack of
//! any guards composes around a service whose error is `ResilienceError<E>`
//! without hand-written conversions.
//!
//! ```rust
//! use tower_guard_core::ResilienceError;
//!
//! #[derive(Debug)]
//! enum AppError {
//!     Unavailable,
//! }
//!
//! impl std::fmt::Display for AppError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "unavailable")
//!     }
//! }
//!
//! impl std::error::Error for AppError {}
//!
//! fn describe(error: &ResilienceError<AppError>) -> &'static str {
//!     match error {
//!         ResilienceError::CallNotPermitted { .. } => "circuit open",
//!         ResilienceError::BulkheadFull { .. } => "too many concurrent calls",
//!         ResilienceError::RequestNotPermitted { .. } => "rate limited",
//!         ResilienceError::Application(_) => "downstream failed",
//!     }
//! }
//!
//! assert_eq!(describe(&ResilienceError::Application(AppError::Unavailable)), "downstream failed");
//! ```

use std::time::Duration;
use thiserror::Error;

/// A common error type that wraps all guard rejections and the wrapped
/// operation's own error.
///
/// Rejections (`CallNotPermitted`, `BulkheadFull`, `RequestNotPermitted`) mean
/// the downstream was never reached. `Application` carries the downstream's
/// own failure unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResilienceError<E> {
    /// The circuit breaker is open, or its half-open trial quota is used up.
    #[error("circuit breaker '{name}' does not permit further calls")]
    CallNotPermitted {
        /// Circuit breaker name.
        name: String,
    },

    /// The bulkhead had no free permit within its maximum wait.
    #[error("bulkhead '{name}' is full ({max_concurrent_calls} concurrent calls)")]
    BulkheadFull {
        /// Bulkhead name.
        name: String,
        /// Maximum allowed concurrent calls.
        max_concurrent_calls: usize,
    },

    /// The rate limiter had no token within its timeout.
    #[error("rate limiter '{name}' does not permit further calls")]
    RequestNotPermitted {
        /// Rate limiter name.
        name: String,
        /// Time until the next refresh, when known.
        retry_after: Option<Duration>,
    },

    /// The wrapped operation failed.
    #[error("application error: {0}")]
    Application(E),
}

impl<E> ResilienceError<E> {
    /// Returns `true` if a circuit breaker rejected the call.
    pub fn is_call_not_permitted(&self) -> bool {
        matches!(self, ResilienceError::CallNotPermitted { .. })
    }

    /// Returns `true` if a bulkhead rejected the call.
    pub fn is_bulkhead_full(&self) -> bool {
        matches!(self, ResilienceError::BulkheadFull { .. })
    }

    /// Returns `true` if a rate limiter rejected the call.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ResilienceError::RequestNotPermitted { .. })
    }

    /// Returns `true` for any admission rejection (the downstream was never called).
    pub fn is_rejection(&self) -> bool {
        !self.is_application()
    }

    /// Returns `true` if this is an application error.
    pub fn is_application(&self) -> bool {
        matches!(self, ResilienceError::Application(_))
    }

    /// Borrows the application error, if this is an `Application` variant.
    pub fn as_application(&self) -> Option<&E> {
        match self {
            ResilienceError::Application(e) => Some(e),
            _ => None,
        }
    }

    /// Extracts the application error, if this is an `Application` variant.
    pub fn application_error(self) -> Option<E> {
        match self {
            ResilienceError::Application(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the application error using a function.
    ///
    /// ```
    /// use tower_guard_core::ResilienceError;
    ///
    /// let err: ResilienceError<String> = ResilienceError::Application("error".to_string());
    /// let mapped: ResilienceError<usize> = err.map_application(|s| s.len());
    /// assert_eq!(mapped.application_error(), Some(5));
    /// ```
    pub fn map_application<F, T>(self, f: F) -> ResilienceError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            ResilienceError::CallNotPermitted { name } => ResilienceError::CallNotPermitted { name },
            ResilienceError::BulkheadFull {
                name,
                max_concurrent_calls,
            } => ResilienceError::BulkheadFull {
                name,
                max_concurrent_calls,
            },
            ResilienceError::RequestNotPermitted { name, retry_after } => {
                ResilienceError::RequestNotPermitted { name, retry_after }
            }
            ResilienceError::Application(e) => ResilienceError::Application(f(e)),
        }
    }
}

// Conversions from each guard's rejection error live in the guard crates.
