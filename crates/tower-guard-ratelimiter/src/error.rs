use std::time::Duration;
use tower_guard_core::ResilienceError;

/// Rejection returned when no token is available in time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimiterError {
    /// The period's tokens are used up and the next refill is past the timeout.
    #[error("rate limiter '{name}' does not permit further calls")]
    RequestNotPermitted {
        /// Rate limiter name.
        name: String,
        /// Time until the next refill.
        retry_after: Duration,
    },
}

impl<E> From<RateLimiterError> for ResilienceError<E> {
    fn from(err: RateLimiterError) -> Self {
        match err {
            RateLimiterError::RequestNotPermitted { name, retry_after } => {
                ResilienceError::RequestNotPermitted {
                    name,
                    retry_after: Some(retry_after),
                }
            }
        }
    }
}

/// Invalid rate limiter settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The limit must allow at least one call per period.
    #[error("limit for period must be at least 1")]
    InvalidLimitForPeriod,

    /// The refresh period must be positive.
    #[error("limit refresh period must be greater than zero")]
    InvalidRefreshPeriod,
}
