//! Layer for the fallback service.

use crate::{FallbackConfig, FallbackConfigBuilder, FallbackService};
use std::sync::Arc;
use tower::Layer;

/// A Tower layer that substitutes values for matching errors.
///
/// # Example
///
/// ```rust
/// use tower_guard_fallback::{FallbackLayer, Outcome};
/// use tower::{service_fn, ServiceBuilder, ServiceExt};
///
/// # #[derive(Debug)]
/// # struct Unavailable;
/// # async fn example() {
/// let layer = FallbackLayer::<String, Unavailable>::builder()
///     .name("downstreamA")
///     .value_on("unavailable", |_| true, "cached".to_string())
///     .build();
///
/// let service = ServiceBuilder::new()
///     .layer(layer)
///     .service(service_fn(|_req: ()| async { Err::<String, _>(Unavailable) }));
///
/// let outcome = service.oneshot(()).await.unwrap();
/// assert_eq!(outcome, Outcome::Degraded("cached".to_string()));
/// # }
/// ```
pub struct FallbackLayer<Res, E> {
    config: Arc<FallbackConfig<Res, E>>,
}

impl<Res, E> FallbackLayer<Res, E> {
    pub(crate) fn new(config: FallbackConfig<Res, E>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a builder.
    pub fn builder() -> FallbackConfigBuilder<Res, E> {
        FallbackConfigBuilder::new()
    }

    pub fn config(&self) -> &FallbackConfig<Res, E> {
        &self.config
    }
}

impl<Res, E> Clone for FallbackLayer<Res, E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Res, E> Layer<S> for FallbackLayer<Res, E> {
    type Service = FallbackService<S, Res, E>;

    fn layer(&self, service: S) -> Self::Service {
        FallbackService::new(service, Arc::clone(&self.config))
    }
}
