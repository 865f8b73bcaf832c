use crate::{RateLimiter, RateLimiterService};
use tower::Layer;

/// A Tower layer that takes one token from a shared [`RateLimiter`] per call.
#[derive(Clone)]
pub struct RateLimiterLayer {
    limiter: RateLimiter,
}

impl RateLimiterLayer {
    pub(crate) fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }

    /// The limiter shared by services built from this layer.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiterService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimiterService::new(service, self.limiter.clone())
    }
}
