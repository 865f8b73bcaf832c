use crate::classifier::FailureClassifier;
use crate::{CircuitBreaker, CircuitBreakerError};
use futures::future::BoxFuture;
use std::fmt::Display;
use std::task::{Context, Poll};
use tokio::time::Instant;
use tower::Service;

/// A Tower service that admits calls through a [`CircuitBreaker`].
///
/// Rejections surface as `S::Error` through `From<CircuitBreakerError>`;
/// the inner service's own errors pass through unchanged.
pub struct CircuitBreakerService<S, C> {
    inner: S,
    breaker: CircuitBreaker,
    classifier: C,
}

impl<S, C> CircuitBreakerService<S, C> {
    pub(crate) fn new(inner: S, breaker: CircuitBreaker, classifier: C) -> Self {
        Self {
            inner,
            breaker,
            classifier,
        }
    }

    /// The breaker guarding this service.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

impl<S: Clone, C: Clone> Clone for CircuitBreakerService<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            breaker: self.breaker.clone(),
            classifier: self.classifier.clone(),
        }
    }
}

impl<S, C, Req> Service<Req> for CircuitBreakerService<S, C>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: From<CircuitBreakerError> + Display + Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
    C: FailureClassifier<S::Response, S::Error> + Clone + Send + Sync + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        // The ready inner service goes into the future; a fresh clone stays behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let breaker = self.breaker.clone();
        let classifier = self.classifier.clone();

        Box::pin(async move {
            let permit = breaker.try_acquire()?;

            let start = Instant::now();
            let result = inner.call(req).await;
            let elapsed = start.elapsed();

            if classifier.classify(&result) {
                match &result {
                    Err(e) => permit.record_failure(elapsed, e),
                    Ok(_) => permit.record_failure(elapsed, "response classified as failure"),
                }
            } else {
                permit.record_success(elapsed);
            }

            result
        })
    }
}
