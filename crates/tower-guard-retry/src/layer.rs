use crate::{RetryConfig, RetryService};
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that retries failed calls.
///
/// Cloning the layer shares its configuration and listeners.
///
/// ```
/// use tower_guard_retry::RetryLayer;
/// use tower::ServiceBuilder;
/// use std::time::Duration;
///
/// # #[derive(Debug)]
/// # struct MyError;
/// # async fn example() {
/// let retry_layer = RetryLayer::<MyError>::builder()
///     .max_attempts(3)
///     .exponential_random_backoff(Duration::from_millis(200), 2.0, 0.5)
///     .build();
///
/// let service = ServiceBuilder::new()
///     .layer(retry_layer)
///     .service(tower::service_fn(|req: String| async move { Ok::<_, MyError>(req) }));
/// # }
/// ```
pub struct RetryLayer<E> {
    config: Arc<RetryConfig<E>>,
}

impl<E> RetryLayer<E> {
    /// Creates a new `RetryLayer` with the given configuration.
    pub fn new(config: RetryConfig<E>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new builder for configuring a retry layer.
    pub fn builder() -> crate::RetryConfigBuilder<E> {
        crate::RetryConfigBuilder::new()
    }

    /// The shared configuration.
    pub fn config(&self) -> &RetryConfig<E> {
        &self.config
    }
}

impl<E> Clone for RetryLayer<E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, E> Layer<S> for RetryLayer<E> {
    type Service = RetryService<S, E>;

    fn layer(&self, service: S) -> Self::Service {
        RetryService::new(service, Arc::clone(&self.config))
    }
}
