//! Guard stacks in a fixed order.
//!
//! Two paths are supported:
//!
//! - retry path: Fallback → Retry → CircuitBreaker → operation. Every attempt
//!   passes through the breaker, so each one is admitted and recorded on its
//!   own, and a breaker rejection ends the retry loop.
//! - admission path: Fallback → Bulkhead → RateLimiter → operation. A call
//!   holds a bulkhead permit while it waits for a rate limiter token.

use crate::downstream::{DownstreamError, GuardError};
use std::future::Future;
use std::sync::Arc;
use tower::{service_fn, ServiceBuilder, ServiceExt};
use tower_guard_bulkhead::Bulkhead;
use tower_guard_circuitbreaker::CircuitBreaker;
use tower_guard_core::ResilienceError;
use tower_guard_fallback::{FallbackLayer, Outcome};
use tower_guard_ratelimiter::RateLimiter;
use tower_guard_retry::RetryLayer;

#[derive(Clone)]
enum Stack {
    Retry {
        retry: RetryLayer<GuardError>,
        breaker: CircuitBreaker,
    },
    Admission {
        bulkhead: Bulkhead,
        limiter: RateLimiter,
    },
}

/// A guarded call to the downstream.
///
/// Guards are shared handles, so several `GuardedCall`s built from the same
/// registry observe and update the same state.
///
/// # Example
///
/// ```rust
/// use tower_guard::{DownstreamError, GuardedCall};
/// use tower_guard_circuitbreaker::CircuitBreakerConfig;
/// use tower_guard_retry::RetryLayer;
/// use std::time::Duration;
///
/// # async fn example() {
/// let breaker = CircuitBreakerConfig::builder().name("downstreamA").build();
/// let retry = RetryLayer::builder()
///     .name("downstreamA")
///     .max_attempts(3)
///     .fixed_backoff(Duration::from_millis(10))
///     .retry_on(tower_guard::is_retryable)
///     .build();
///
/// let call = GuardedCall::<String>::retry_path(retry, breaker);
/// let outcome = call
///     .call(|| async { Ok::<_, DownstreamError>("OK".to_string()) })
///     .await;
/// assert_eq!(outcome.unwrap().into_inner(), "OK");
/// # }
/// ```
pub struct GuardedCall<T> {
    stack: Stack,
    fallback: FallbackLayer<T, GuardError>,
}

impl<T> Clone for GuardedCall<T> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

impl<T> GuardedCall<T>
where
    T: Send + 'static,
{
    /// Fallback → Retry → CircuitBreaker → operation.
    pub fn retry_path(retry: RetryLayer<GuardError>, breaker: CircuitBreaker) -> Self {
        let name = breaker.name().to_string();
        Self {
            stack: Stack::Retry { retry, breaker },
            fallback: FallbackLayer::builder().name(name).build(),
        }
    }

    /// Fallback → Bulkhead → RateLimiter → operation.
    pub fn admission_path(bulkhead: Bulkhead, limiter: RateLimiter) -> Self {
        let name = bulkhead.name().to_string();
        Self {
            stack: Stack::Admission { bulkhead, limiter },
            fallback: FallbackLayer::builder().name(name).build(),
        }
    }

    /// Replaces the fallback handlers. Without this, no error is substituted.
    pub fn with_fallback(mut self, fallback: FallbackLayer<T, GuardError>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Runs `op` through the guards.
    ///
    /// `op` may be invoked several times on the retry path, once per attempt.
    pub async fn call<F, Fut>(&self, op: F) -> Result<Outcome<T>, GuardError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, DownstreamError>> + Send + 'static,
    {
        let op = Arc::new(op);
        let operation = service_fn(move |()| {
            let op = Arc::clone(&op);
            async move { op().await.map_err(ResilienceError::Application) }
        });

        match &self.stack {
            Stack::Retry { retry, breaker } => {
                ServiceBuilder::new()
                    .layer(self.fallback.clone())
                    .layer(retry.clone())
                    .layer(breaker.layer())
                    .service(operation)
                    .oneshot(())
                    .await
            }
            Stack::Admission { bulkhead, limiter } => {
                ServiceBuilder::new()
                    .layer(self.fallback.clone())
                    .layer(bulkhead.layer())
                    .layer(limiter.layer())
                    .service(operation)
                    .oneshot(())
                    .await
            }
        }
    }
}
