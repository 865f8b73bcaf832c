use crate::classifier::{DefaultClassifier, FnClassifier};
use crate::service::CircuitBreakerService;
use crate::CircuitBreaker;
use tower::Layer;

/// A Tower layer that guards an inner service with a [`CircuitBreaker`].
///
/// Every service produced by the same layer shares one circuit.
///
/// ```rust
/// use tower::{Layer, service_fn};
/// use tower_guard_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerError};
///
/// # #[derive(Debug)] struct Error;
/// # impl std::fmt::Display for Error {
/// #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str("error") }
/// # }
/// # impl From<CircuitBreakerError> for Error { fn from(_: CircuitBreakerError) -> Self { Error } }
/// let breaker = CircuitBreakerConfig::builder().name("downstreamA").build();
///
/// // Only 5xx statuses count as failures
/// let layer = breaker
///     .layer()
///     .with_classifier(|result: &Result<u16, Error>| match result {
///         Ok(status) => *status >= 500,
///         Err(_) => true,
///     });
///
/// let service = layer.layer(service_fn(|_req: ()| async { Ok::<u16, Error>(200) }));
/// ```
#[derive(Clone)]
pub struct CircuitBreakerLayer<C = DefaultClassifier> {
    breaker: CircuitBreaker,
    classifier: C,
}

impl CircuitBreakerLayer<DefaultClassifier> {
    pub(crate) fn new(breaker: CircuitBreaker) -> Self {
        Self {
            breaker,
            classifier: DefaultClassifier,
        }
    }
}

impl<C> CircuitBreakerLayer<C> {
    /// Replaces the failure classifier.
    pub fn with_classifier<F>(self, f: F) -> CircuitBreakerLayer<FnClassifier<F>> {
        CircuitBreakerLayer {
            breaker: self.breaker,
            classifier: FnClassifier::new(f),
        }
    }

    /// The breaker shared by services built from this layer.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

impl<S, C: Clone> Layer<S> for CircuitBreakerLayer<C> {
    type Service = CircuitBreakerService<S, C>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreakerService::new(service, self.breaker.clone(), self.classifier.clone())
    }
}
