//! Retry middleware for Tower services.
//!
//! Retries a failed call up to `max_attempts` times (counting the first),
//! sleeping between attempts according to an [`IntervalFunction`]. Errors the
//! retry predicate rejects end the call immediately, so admission rejections
//! and client errors are never hammered.
//!
//! ## Backoff strategies
//!
//! - [`FixedInterval`]: same delay every time
//! - [`ExponentialBackoff`]: `initial * multiplier^n`
//! - [`ExponentialRandomBackoff`]: exponential with uniform jitter
//! - [`FnInterval`]: any closure
//!
//! ## Example
//!
//! ```rust
//! use tower_guard_retry::RetryLayer;
//! use tower::{Layer, ServiceExt, service_fn};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Unavailable,
//!     BadRequest,
//! }
//!
//! # async fn example() {
//! let layer = RetryLayer::<MyError>::builder()
//!     .name("downstreamA")
//!     .max_attempts(3)
//!     .exponential_random_backoff(Duration::from_millis(200), 2.0, 0.5)
//!     .retry_on(|e: &MyError| matches!(e, MyError::Unavailable))
//!     .build();
//!
//! let service = layer.layer(service_fn(|req: String| async move { Ok::<_, MyError>(req) }));
//! let response = service.oneshot("hello".to_string()).await;
//! # }
//! ```
//!
//! ## Cancellation
//!
//! Dropping the response future during a back-off sleep abandons the call;
//! nothing is held across the sleep.

pub use backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
};
pub use config::{ConfigError, RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;
pub use layer::RetryLayer;
pub use policy::{RetryPolicy, RetryPredicate};

mod backoff;
mod config;
mod events;
mod layer;
mod policy;

use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Service, ServiceExt};

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A Tower [`Service`] that retries failed requests.
///
/// Every attempt waits for the inner service to become ready before calling
/// it, so an inner guard sees each attempt as a separate call.
pub struct RetryService<S, E> {
    inner: S,
    config: Arc<RetryConfig<E>>,
}

impl<S, E> RetryService<S, E> {
    /// Creates a new `RetryService` wrapping the given service.
    pub fn new(inner: S, config: Arc<RetryConfig<E>>) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "retry_calls_total",
                "Calls through the retry middleware by final outcome"
            );
            describe_counter!("retry_attempts_total", "Retry attempts made");
        });

        Self { inner, config }
    }
}

impl<S, E> Clone for RetryService<S, E>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req, E> Service<Req> for RetryService<S, E>
where
    S: Service<Req, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    Req: Clone + Send + 'static,
    E: Send + 'static,
{
    type Response = S::Response;
    type Error = E;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let clone = self.inner.clone();
        let mut service = std::mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let mut attempt = 1;

            loop {
                // The first attempt uses the service readied by poll_ready.
                let result = if attempt == 1 {
                    service.call(req.clone()).await
                } else {
                    match service.ready().await {
                        Ok(ready) => ready.call(req.clone()).await,
                        Err(e) => Err(e),
                    }
                };

                let error = match result {
                    Ok(response) => {
                        config.event_listeners.emit(&RetryEvent::Success {
                            guard_name: config.name.clone(),
                            timestamp: Instant::now(),
                            attempts: attempt,
                        });

                        #[cfg(feature = "metrics")]
                        counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => "success").increment(1);

                        return Ok(response);
                    }
                    Err(error) => error,
                };

                if !config.policy.should_retry(&error) {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(retry = %config.name, attempt, "error is not retryable");

                    config.event_listeners.emit(&RetryEvent::IgnoredError {
                        guard_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => "ignored").increment(1);

                    return Err(error);
                }

                if attempt >= config.policy.max_attempts {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(retry = %config.name, attempts = attempt, "retries exhausted");

                    config.event_listeners.emit(&RetryEvent::Error {
                        guard_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => "exhausted").increment(1);

                    return Err(error);
                }

                let delay = config.policy.backoff_after(attempt);

                #[cfg(feature = "tracing")]
                tracing::debug!(retry = %config.name, attempt, ?delay, "retrying after failure");

                #[cfg(feature = "metrics")]
                counter!("retry_attempts_total", "retry" => config.name.clone()).increment(1);

                config.event_listeners.emit(&RetryEvent::Retry {
                    guard_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempt,
                    delay,
                });

                drop(error);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        })
    }
}
