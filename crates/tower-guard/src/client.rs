//! A downstream client with two guarded call paths.

use crate::downstream::{DownstreamError, GuardError};
use crate::pipeline::GuardedCall;
use crate::registry::ResilienceRegistry;
use crate::settings::SettingsError;
use futures::future::BoxFuture;
use std::sync::Arc;
use tower_guard_fallback::{FallbackLayer, Outcome};

/// Value returned when the retry path gives up on a recoverable failure.
pub const FALLBACK: &str = "FALLBACK";

/// Transport to the downstream service.
pub trait Downstream: Send + Sync + 'static {
    /// Fetches the downstream's data.
    fn get_data(&self) -> BoxFuture<'_, Result<String, DownstreamError>>;
}

/// Calls a [`Downstream`] through guards looked up by name.
///
/// - [`get_data`](Self::get_data) goes through retry and the circuit breaker,
///   and falls back to [`FALLBACK`] for an open circuit, a transport failure
///   or a 5xx response.
/// - [`get_data_without_retry`](Self::get_data_without_retry) goes through
///   the bulkhead and the rate limiter, with no fallback.
pub struct DownstreamClient<T> {
    transport: Arc<T>,
    with_retry: GuardedCall<String>,
    without_retry: GuardedCall<String>,
}

impl<T> Clone for DownstreamClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            with_retry: self.with_retry.clone(),
            without_retry: self.without_retry.clone(),
        }
    }
}

impl<T: Downstream> DownstreamClient<T> {
    /// Wires `transport` to the guards registered under `name`.
    ///
    /// Fails if any of the four guards is missing from the registry.
    pub fn new(
        transport: T,
        registry: &ResilienceRegistry,
        name: &str,
    ) -> Result<Self, SettingsError> {
        let missing = |kind: &'static str| SettingsError::MissingProfile {
            kind,
            name: name.to_string(),
        };

        let retry = registry.retry(name).ok_or_else(|| missing("retry"))?;
        let breaker = registry
            .circuit_breaker(name)
            .ok_or_else(|| missing("circuit breaker"))?;
        let bulkhead = registry.bulkhead(name).ok_or_else(|| missing("bulkhead"))?;
        let limiter = registry
            .rate_limiter(name)
            .ok_or_else(|| missing("rate limiter"))?;

        let fallback = FallbackLayer::<String, GuardError>::builder()
            .name(name)
            .value_on(
                "call-not-permitted",
                GuardError::is_call_not_permitted,
                FALLBACK.to_string(),
            )
            .value_on(
                "transport",
                |e: &GuardError| e.as_application().is_some_and(DownstreamError::is_transport),
                FALLBACK.to_string(),
            )
            .value_on(
                "server-error",
                |e: &GuardError| {
                    e.as_application()
                        .is_some_and(DownstreamError::is_server_error)
                },
                FALLBACK.to_string(),
            )
            .build();

        Ok(Self {
            transport: Arc::new(transport),
            with_retry: GuardedCall::retry_path(retry.clone(), breaker.clone())
                .with_fallback(fallback),
            without_retry: GuardedCall::admission_path(bulkhead.clone(), limiter.clone()),
        })
    }

    /// Retry path. A substituted [`FALLBACK`] comes back as [`Outcome::Degraded`].
    pub async fn get_data(&self) -> Result<Outcome<String>, GuardError> {
        let transport = Arc::clone(&self.transport);
        self.with_retry
            .call(move || {
                let transport = Arc::clone(&transport);
                async move { transport.get_data().await }
            })
            .await
    }

    /// Admission path: bulkhead then rate limiter, rejections surface as errors.
    pub async fn get_data_without_retry(&self) -> Result<String, GuardError> {
        let transport = Arc::clone(&self.transport);
        self.without_retry
            .call(move || {
                let transport = Arc::clone(&transport);
                async move { transport.get_data().await }
            })
            .await
            .map(Outcome::into_inner)
    }

    /// The transport both call paths go through.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
