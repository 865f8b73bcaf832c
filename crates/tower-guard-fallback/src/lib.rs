//! Ordered fallback handlers for Tower services.
//!
//! When the inner service fails, the handlers are tried in registration
//! order. The first one whose predicate matches the error produces a
//! substitute value, returned as [`Outcome::Degraded`]. If no handler
//! matches, the original error propagates unchanged. Successes from the
//! inner service are returned as [`Outcome::Primary`].
//!
//! # Example
//!
//! ```rust
//! use tower_guard_fallback::FallbackLayer;
//!
//! #[derive(Debug)]
//! enum FetchError {
//!     Rejected,
//!     Transport(String),
//!     Status(u16),
//! }
//!
//! let layer = FallbackLayer::<String, FetchError>::builder()
//!     .name("downstreamA")
//!     .value_on("rejected", |e| matches!(e, FetchError::Rejected), "FALLBACK".to_string())
//!     .value_on("transport", |e| matches!(e, FetchError::Transport(_)), "FALLBACK".to_string())
//!     .handler("server-error", |e| matches!(e, FetchError::Status(s) if *s >= 500), |e| {
//!         format!("degraded: {e:?}")
//!     })
//!     .build();
//! # let _ = layer;
//! ```
//!
//! # Events
//!
//! - `Success`: inner service succeeded, no fallback needed
//! - `Applied`: a handler matched; carries the handler name
//! - `Skipped`: no handler matched, error propagated as-is

mod config;
mod events;
mod layer;
mod outcome;

pub use config::{
    FallbackConfig, FallbackConfigBuilder, FallbackHandler, HandlePredicate, ResolveFn,
};
pub use events::FallbackEvent;
pub use layer::FallbackLayer;
pub use outcome::Outcome;

use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::Service;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A Tower service that substitutes values for matching errors.
///
/// See the [crate-level documentation](crate) for usage examples.
pub struct FallbackService<S, Res, E> {
    inner: S,
    config: Arc<FallbackConfig<Res, E>>,
}

impl<S, Res, E> FallbackService<S, Res, E> {
    /// Creates a new `FallbackService` wrapping the given service.
    pub fn new(inner: S, config: Arc<FallbackConfig<Res, E>>) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "fallback_calls_total",
                "Total number of fallback operations"
            );
        });

        Self { inner, config }
    }
}

impl<S, Res, E> Clone for FallbackService<S, Res, E>
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

impl<S, Req, Res, E> Service<Req> for FallbackService<S, Res, E>
where
    S: Service<Req, Response = Res, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
    Res: Send + 'static,
    E: Send + 'static,
{
    type Response = Outcome<Res>;
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
            let error = match service.call(req).await {
                Ok(response) => {
                    #[cfg(feature = "metrics")]
                    counter!(
                        "fallback_calls_total",
                        "fallback" => config.name.clone(),
                        "result" => "success"
                    )
                    .increment(1);

                    config.event_listeners.emit(&FallbackEvent::Success {
                        guard_name: config.name.clone(),
                        timestamp: Instant::now(),
                    });

                    return Ok(Outcome::Primary(response));
                }
                Err(error) => error,
            };

            match config.resolve(&error) {
                Some((handler, substitute)) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(fallback = %config.name, handler, "applying fallback");

                    #[cfg(feature = "metrics")]
                    counter!(
                        "fallback_calls_total",
                        "fallback" => config.name.clone(),
                        "result" => "applied",
                        "handler" => handler.to_string()
                    )
                    .increment(1);

                    config.event_listeners.emit(&FallbackEvent::Applied {
                        guard_name: config.name.clone(),
                        timestamp: Instant::now(),
                        handler: handler.to_string(),
                    });

                    Ok(Outcome::Degraded(substitute))
                }
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(fallback = %config.name, "no handler matched, propagating error");

                    #[cfg(feature = "metrics")]
                    counter!(
                        "fallback_calls_total",
                        "fallback" => config.name.clone(),
                        "result" => "skipped"
                    )
                    .increment(1);

                    config.event_listeners.emit(&FallbackEvent::Skipped {
                        guard_name: config.name.clone(),
                        timestamp: Instant::now(),
                    });

                    Err(error)
                }
            }
        })
    }
}
