//! Named, shared guard instances.
//!
//! The registry is built once at start-up and handed to whatever needs a
//! guard. Every lookup for the same name returns the same instance, so two
//! pipelines using `"downstreamA"` share one breaker, one bulkhead and one
//! rate limiter. Lookups never create instances.

use crate::downstream::GuardError;
use crate::logging::LoggingListener;
use crate::pipeline::GuardedCall;
use crate::settings::{GuardSettings, SettingsError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tower_guard_bulkhead::Bulkhead;
use tower_guard_circuitbreaker::CircuitBreaker;
use tower_guard_ratelimiter::RateLimiter;
use tower_guard_retry::RetryLayer;

/// Shared guard instances by name.
#[derive(Clone, Default)]
pub struct ResilienceRegistry {
    circuit_breakers: HashMap<String, CircuitBreaker>,
    retries: HashMap<String, RetryLayer<GuardError>>,
    bulkheads: HashMap<String, Bulkhead>,
    rate_limiters: HashMap<String, RateLimiter>,
}

impl ResilienceRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Builds every profile in `settings`, with a [`LoggingListener`] attached
    /// to each guard.
    pub fn from_settings(settings: &GuardSettings) -> Result<Self, SettingsError> {
        Ok(Self::builder()
            .with_settings(settings, Some(LoggingListener::shared()))?
            .build())
    }

    pub fn circuit_breaker(&self, name: &str) -> Option<&CircuitBreaker> {
        self.circuit_breakers.get(name)
    }

    pub fn retry(&self, name: &str) -> Option<&RetryLayer<GuardError>> {
        self.retries.get(name)
    }

    pub fn bulkhead(&self, name: &str) -> Option<&Bulkhead> {
        self.bulkheads.get(name)
    }

    pub fn rate_limiter(&self, name: &str) -> Option<&RateLimiter> {
        self.rate_limiters.get(name)
    }

    /// Fallback → Retry → CircuitBreaker, using the retry and breaker named `name`.
    pub fn retry_path<T: Send + 'static>(&self, name: &str) -> Option<GuardedCall<T>> {
        let retry = self.retry(name)?.clone();
        let breaker = self.circuit_breaker(name)?.clone();
        Some(GuardedCall::retry_path(retry, breaker))
    }

    /// Fallback → Bulkhead → RateLimiter, using the bulkhead and limiter named `name`.
    pub fn admission_path<T: Send + 'static>(&self, name: &str) -> Option<GuardedCall<T>> {
        let bulkhead = self.bulkhead(name)?.clone();
        let limiter = self.rate_limiter(name)?.clone();
        Some(GuardedCall::admission_path(bulkhead, limiter))
    }
}

impl fmt::Debug for ResilienceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn names<V>(map: &HashMap<String, V>) -> Vec<&str> {
            let mut names: Vec<&str> = map.keys().map(String::as_str).collect();
            names.sort_unstable();
            names
        }

        f.debug_struct("ResilienceRegistry")
            .field("circuit_breakers", &names(&self.circuit_breakers))
            .field("retries", &names(&self.retries))
            .field("bulkheads", &names(&self.bulkheads))
            .field("rate_limiters", &names(&self.rate_limiters))
            .finish()
    }
}

/// Collects guard instances for a [`ResilienceRegistry`].
///
/// Instances are registered under their own configured name. Registering a
/// second instance with the same name replaces the first.
#[derive(Default)]
pub struct RegistryBuilder {
    registry: ResilienceRegistry,
}

impl RegistryBuilder {
    pub fn circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.registry
            .circuit_breakers
            .insert(breaker.name().to_string(), breaker);
        self
    }

    pub fn retry(mut self, retry: RetryLayer<GuardError>) -> Self {
        self.registry
            .retries
            .insert(retry.config().name().to_string(), retry);
        self
    }

    pub fn bulkhead(mut self, bulkhead: Bulkhead) -> Self {
        self.registry
            .bulkheads
            .insert(bulkhead.name().to_string(), bulkhead);
        self
    }

    pub fn rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.registry
            .rate_limiters
            .insert(limiter.name().to_string(), limiter);
        self
    }

    /// Builds and registers every profile in `settings`.
    ///
    /// When `listener` is given it is attached to every guard built here.
    pub fn with_settings(
        mut self,
        settings: &GuardSettings,
        listener: Option<Arc<LoggingListener>>,
    ) -> Result<Self, SettingsError> {
        for (name, profile) in &settings.circuit_breakers {
            let mut builder = profile.to_builder(name);
            if let Some(l) = &listener {
                builder = builder.event_listener(l.clone());
            }
            let breaker = builder
                .try_build()
                .map_err(|source| SettingsError::CircuitBreaker {
                    name: name.clone(),
                    source,
                })?;
            self = self.circuit_breaker(breaker);
        }

        for (name, profile) in &settings.retries {
            let mut builder = profile.to_builder(name);
            if let Some(l) = &listener {
                builder = builder.event_listener(l.clone());
            }
            let retry = builder.try_build().map_err(|source| SettingsError::Retry {
                name: name.clone(),
                source,
            })?;
            self = self.retry(retry);
        }

        for (name, profile) in &settings.bulkheads {
            let mut builder = profile.to_builder(name);
            if let Some(l) = &listener {
                builder = builder.event_listener(l.clone());
            }
            let bulkhead = builder.try_build().map_err(|source| SettingsError::Bulkhead {
                name: name.clone(),
                source,
            })?;
            self = self.bulkhead(bulkhead);
        }

        for (name, profile) in &settings.rate_limiters {
            let mut builder = profile.to_builder(name);
            if let Some(l) = &listener {
                builder = builder.event_listener(l.clone());
            }
            let limiter = builder
                .try_build()
                .map_err(|source| SettingsError::RateLimiter {
                    name: name.clone(),
                    source,
                })?;
            self = self.rate_limiter(limiter);
        }

        Ok(self)
    }

    pub fn build(self) -> ResilienceRegistry {
        self.registry
    }
}
