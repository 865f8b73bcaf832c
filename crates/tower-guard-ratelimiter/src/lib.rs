//! Fixed-period rate limiter for Tower services.
//!
//! Admits at most `limit_for_period` calls per `limit_refresh_period`. All
//! tokens come back at once when a period ends. A call that finds the bucket
//! empty waits for the next period if it starts within `timeout_duration`,
//! otherwise it is rejected with [`RateLimiterError::RequestNotPermitted`].
//!
//! Tokens are never handed back: a call that fails after being admitted
//! still counts against its period.
//!
//! # Example
//!
//! ```rust
//! use tower_guard_ratelimiter::{RateLimiterConfig, RateLimiterError};
//! use tower::{ServiceBuilder, service_fn};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! struct Limited;
//!
//! impl From<RateLimiterError> for Limited {
//!     fn from(_: RateLimiterError) -> Self {
//!         Limited
//!     }
//! }
//!
//! # async fn example() {
//! let limiter = RateLimiterConfig::builder()
//!     .name("downstreamA")
//!     .limit_for_period(2)
//!     .limit_refresh_period(Duration::from_secs(1))
//!     .timeout_duration(Duration::ZERO)
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(limiter.layer())
//!     .service(service_fn(|req: String| async move { Ok::<_, Limited>(req) }));
//! # }
//! ```

use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;
use tower::Service;

mod config;
mod error;
mod events;
mod layer;
mod limiter;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use error::{ConfigError, RateLimiterError};
pub use events::RateLimiterEvent;
pub use layer::RateLimiterLayer;

use limiter::{Acquire, RateLimiterState};

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

struct Shared {
    config: RateLimiterConfig,
    state: Mutex<RateLimiterState>,
}

/// A shareable rate limiter.
///
/// All clones draw from the same bucket.
#[derive(Clone)]
pub struct RateLimiter {
    shared: Arc<Shared>,
}

impl RateLimiter {
    /// Creates a rate limiter whose first period starts now.
    pub fn new(config: RateLimiterConfig) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "ratelimiter_calls_total",
                "Calls through the rate limiter by outcome"
            );
        });

        let state = RateLimiterState::new(
            config.limit_for_period,
            config.limit_refresh_period,
            Instant::now(),
        );
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(state),
            }),
        }
    }

    /// The limiter's name.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// The configuration this limiter was built with.
    pub fn config(&self) -> &RateLimiterConfig {
        &self.shared.config
    }

    /// Tokens left in the current period.
    pub fn available_permissions(&self) -> usize {
        self.lock().available_permits(Instant::now())
    }

    /// Takes one token, waiting up to the timeout for the next period.
    /// Returns how long the caller waited.
    ///
    /// When no token can arrive before the timeout the caller is still held
    /// until the timeout ends, then rejected.
    ///
    /// Dropping the future while it waits takes nothing from the bucket.
    pub async fn acquire_permission(&self) -> Result<Duration, RateLimiterError> {
        let start = Instant::now();
        let deadline = start + self.shared.config.timeout_duration;

        loop {
            let now = Instant::now();
            let decision = self.lock().try_acquire(now, deadline);

            match decision {
                Acquire::Granted => {
                    let waited = now.saturating_duration_since(start);
                    self.emit(RateLimiterEvent::PermitAcquired {
                        guard_name: self.name().to_string(),
                        timestamp: std::time::Instant::now(),
                        wait_duration: waited,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("ratelimiter_calls_total", "ratelimiter" => self.name().to_string(), "result" => "permitted").increment(1);

                    return Ok(waited);
                }
                Acquire::WaitFor(delay) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(ratelimiter = self.name(), ?delay, "waiting for next period");

                    tokio::time::sleep(delay).await;
                }
                Acquire::Rejected { .. } if now < deadline => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(ratelimiter = self.name(), "no token before timeout, waiting it out");

                    tokio::time::sleep_until(deadline).await;
                }
                Acquire::Rejected { retry_after } => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(ratelimiter = self.name(), ?retry_after, "request not permitted");

                    self.emit(RateLimiterEvent::PermitRejected {
                        guard_name: self.name().to_string(),
                        timestamp: std::time::Instant::now(),
                        timeout_duration: self.shared.config.timeout_duration,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("ratelimiter_calls_total", "ratelimiter" => self.name().to_string(), "result" => "rejected").increment(1);

                    return Err(RateLimiterError::RequestNotPermitted {
                        name: self.name().to_string(),
                        retry_after,
                    });
                }
            }
        }
    }

    /// Creates a Tower layer that rate-limits services with this limiter.
    pub fn layer(&self) -> RateLimiterLayer {
        RateLimiterLayer::new(self.clone())
    }

    fn emit(&self, event: RateLimiterEvent) {
        self.shared.config.event_listeners.emit(&event);
    }

    fn lock(&self) -> MutexGuard<'_, RateLimiterState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.name())
            .field("limit_for_period", &self.shared.config.limit_for_period)
            .finish()
    }
}

/// A Tower service that takes a rate limiter token before each call.
#[derive(Clone)]
pub struct RateLimiterService<S> {
    inner: S,
    limiter: RateLimiter,
}

impl<S> RateLimiterService<S> {
    pub(crate) fn new(inner: S, limiter: RateLimiter) -> Self {
        Self { inner, limiter }
    }

    /// The limiter guarding this service.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

impl<S, Req> Service<Req> for RateLimiterService<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: From<RateLimiterError> + Send + 'static,
    S::Response: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let limiter = self.limiter.clone();

        Box::pin(async move {
            limiter.acquire_permission().await?;
            inner.call(req).await
        })
    }
}
