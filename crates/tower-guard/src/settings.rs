//! Guard settings loaded from TOML.
//!
//! Each guard kind has a table of named profiles. Durations are given in
//! milliseconds. Missing fields take the guard's defaults.
//!
//! ```toml
//! [circuit_breakers.downstreamA]
//! sliding_window_size = 10
//! minimum_number_of_calls = 10
//! failure_rate_threshold = 50.0
//! wait_duration_in_open_state_ms = 5000
//! permitted_number_of_calls_in_half_open_state = 3
//! automatic_transition_from_open_to_half_open_enabled = true
//!
//! [retries.downstreamA]
//! max_attempts = 3
//! wait_duration_ms = 200
//! backoff = "exponential_random"
//! multiplier = 2.0
//! retry_on = "retryable"
//!
//! [bulkheads.downstreamA]
//! max_concurrent_calls = 2
//! max_wait_duration_ms = 0
//!
//! [rate_limiters.downstreamA]
//! limit_for_period = 2
//! limit_refresh_period_ms = 1000
//! timeout_duration_ms = 0
//! ```

use crate::downstream::{self, GuardError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tower_guard_bulkhead::{BulkheadConfig, BulkheadConfigBuilder};
use tower_guard_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
use tower_guard_ratelimiter::{RateLimiterConfig, RateLimiterConfigBuilder};
use tower_guard_retry::{RetryConfig, RetryConfigBuilder};

/// Errors raised while loading or applying settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("circuit breaker '{name}': {source}")]
    CircuitBreaker {
        name: String,
        #[source]
        source: tower_guard_circuitbreaker::ConfigError,
    },

    #[error("retry '{name}': {source}")]
    Retry {
        name: String,
        #[source]
        source: tower_guard_retry::ConfigError,
    },

    #[error("bulkhead '{name}': {source}")]
    Bulkhead {
        name: String,
        #[source]
        source: tower_guard_bulkhead::ConfigError,
    },

    #[error("rate limiter '{name}': {source}")]
    RateLimiter {
        name: String,
        #[source]
        source: tower_guard_ratelimiter::ConfigError,
    },

    #[error("no {kind} profile named '{name}'")]
    MissingProfile { kind: &'static str, name: String },
}

/// Named guard profiles.
///
/// Two profiles with different values are two different guards; nothing
/// merges them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GuardSettings {
    pub circuit_breakers: BTreeMap<String, CircuitBreakerSettings>,
    pub retries: BTreeMap<String, RetrySettings>,
    pub bulkheads: BTreeMap<String, BulkheadSettings>,
    pub rate_limiters: BTreeMap<String, RateLimiterSettings>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub sliding_window_size: usize,
    /// Defaults to the window size.
    pub minimum_number_of_calls: Option<usize>,
    /// Percent, in `(0, 100]`.
    pub failure_rate_threshold: f32,
    pub wait_duration_in_open_state_ms: u64,
    pub permitted_number_of_calls_in_half_open_state: usize,
    pub automatic_transition_from_open_to_half_open_enabled: bool,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            sliding_window_size: 100,
            minimum_number_of_calls: None,
            failure_rate_threshold: 50.0,
            wait_duration_in_open_state_ms: 60_000,
            permitted_number_of_calls_in_half_open_state: 10,
            automatic_transition_from_open_to_half_open_enabled: false,
        }
    }
}

impl CircuitBreakerSettings {
    /// A config builder carrying these values under `name`.
    pub fn to_builder(&self, name: &str) -> CircuitBreakerConfigBuilder {
        let builder = CircuitBreakerConfig::builder()
            .name(name)
            .sliding_window_size(self.sliding_window_size)
            .failure_rate_threshold(self.failure_rate_threshold)
            .wait_duration_in_open_state(Duration::from_millis(self.wait_duration_in_open_state_ms))
            .permitted_number_of_calls_in_half_open_state(
                self.permitted_number_of_calls_in_half_open_state,
            )
            .automatic_transition_from_open_to_half_open_enabled(
                self.automatic_transition_from_open_to_half_open_enabled,
            );
        match self.minimum_number_of_calls {
            Some(n) => builder.minimum_number_of_calls(n),
            None => builder,
        }
    }
}

/// Shape of the delay between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Fixed,
    Exponential,
    ExponentialRandom,
}

/// Which downstream failures are retried.
///
/// Guard rejections are never retried, whichever is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOn {
    /// Transport failures and 5xx responses.
    Retryable,
    /// Every downstream failure.
    AnyDownstreamError,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: usize,
    /// Base delay before the second attempt.
    pub wait_duration_ms: u64,
    pub backoff: BackoffKind,
    pub multiplier: f64,
    pub randomization_factor: f64,
    pub retry_on: RetryOn,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            wait_duration_ms: 500,
            backoff: BackoffKind::Fixed,
            multiplier: 2.0,
            randomization_factor: tower_guard_retry::ExponentialRandomBackoff::DEFAULT_RANDOMIZATION_FACTOR,
            retry_on: RetryOn::Retryable,
        }
    }
}

impl RetrySettings {
    pub fn to_builder(&self, name: &str) -> RetryConfigBuilder<GuardError> {
        let base = Duration::from_millis(self.wait_duration_ms);
        let builder = RetryConfig::builder()
            .name(name)
            .max_attempts(self.max_attempts);
        let builder = match self.backoff {
            BackoffKind::Fixed => builder.fixed_backoff(base),
            BackoffKind::Exponential => builder.backoff(
                tower_guard_retry::ExponentialBackoff::new(base).multiplier(self.multiplier),
            ),
            BackoffKind::ExponentialRandom => {
                builder.exponential_random_backoff(base, self.multiplier, self.randomization_factor)
            }
        };
        match self.retry_on {
            RetryOn::Retryable => builder.retry_on(downstream::is_retryable),
            RetryOn::AnyDownstreamError => builder.retry_on(GuardError::is_application),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BulkheadSettings {
    pub max_concurrent_calls: usize,
    /// Zero fails at once when no permit is free.
    pub max_wait_duration_ms: u64,
}

impl Default for BulkheadSettings {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 25,
            max_wait_duration_ms: 0,
        }
    }
}

impl BulkheadSettings {
    pub fn to_builder(&self, name: &str) -> BulkheadConfigBuilder {
        BulkheadConfig::builder()
            .name(name)
            .max_concurrent_calls(self.max_concurrent_calls)
            .max_wait_duration(Duration::from_millis(self.max_wait_duration_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimiterSettings {
    pub limit_for_period: usize,
    pub limit_refresh_period_ms: u64,
    /// Zero rejects at once when the period's tokens are used.
    pub timeout_duration_ms: u64,
}

impl Default for RateLimiterSettings {
    fn default() -> Self {
        Self {
            limit_for_period: 50,
            limit_refresh_period_ms: 1_000,
            timeout_duration_ms: 5_000,
        }
    }
}

impl RateLimiterSettings {
    pub fn to_builder(&self, name: &str) -> RateLimiterConfigBuilder {
        RateLimiterConfig::builder()
            .name(name)
            .limit_for_period(self.limit_for_period)
            .limit_refresh_period(Duration::from_millis(self.limit_refresh_period_ms))
            .timeout_duration(Duration::from_millis(self.timeout_duration_ms))
    }
}

impl GuardSettings {
    /// Name of the profile returned by [`GuardSettings::downstream_a`].
    pub const DOWNSTREAM_A: &'static str = "downstreamA";

    /// Parses settings from a TOML document and validates every profile.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: GuardSettings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads and parses settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Checks that every profile builds a valid guard.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (name, cb) in &self.circuit_breakers {
            cb.to_builder(name)
                .try_build_config()
                .map_err(|source| SettingsError::CircuitBreaker {
                    name: name.clone(),
                    source,
                })?;
        }
        for (name, retry) in &self.retries {
            retry
                .to_builder(name)
                .try_build_config()
                .map_err(|source| SettingsError::Retry {
                    name: name.clone(),
                    source,
                })?;
        }
        for (name, bulkhead) in &self.bulkheads {
            bulkhead
                .to_builder(name)
                .try_build_config()
                .map_err(|source| SettingsError::Bulkhead {
                    name: name.clone(),
                    source,
                })?;
        }
        for (name, limiter) in &self.rate_limiters {
            limiter
                .to_builder(name)
                .try_build_config()
                .map_err(|source| SettingsError::RateLimiter {
                    name: name.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// The `downstreamA` profile for every guard kind.
    ///
    /// - breaker: window 10, minimum 10 calls, 50 %, 5 s open, 3 half-open
    ///   trials, automatic half-open transition
    /// - retry: 3 attempts, exponential random backoff from 200 ms × 2.0,
    ///   transport failures and 5xx only
    /// - bulkhead: 2 concurrent calls, no wait
    /// - rate limiter: 2 calls per second, no wait
    pub fn downstream_a() -> Self {
        let name = Self::DOWNSTREAM_A.to_string();
        let mut settings = GuardSettings::default();
        settings.circuit_breakers.insert(
            name.clone(),
            CircuitBreakerSettings {
                sliding_window_size: 10,
                minimum_number_of_calls: Some(10),
                failure_rate_threshold: 50.0,
                wait_duration_in_open_state_ms: 5_000,
                permitted_number_of_calls_in_half_open_state: 3,
                automatic_transition_from_open_to_half_open_enabled: true,
            },
        );
        settings.retries.insert(
            name.clone(),
            RetrySettings {
                max_attempts: 3,
                wait_duration_ms: 200,
                backoff: BackoffKind::ExponentialRandom,
                multiplier: 2.0,
                randomization_factor:
                    tower_guard_retry::ExponentialRandomBackoff::DEFAULT_RANDOMIZATION_FACTOR,
                retry_on: RetryOn::Retryable,
            },
        );
        settings.bulkheads.insert(
            name.clone(),
            BulkheadSettings {
                max_concurrent_calls: 2,
                max_wait_duration_ms: 0,
            },
        );
        settings.rate_limiters.insert(
            name,
            RateLimiterSettings {
                limit_for_period: 2,
                limit_refresh_period_ms: 1_000,
                timeout_duration_ms: 0,
            },
        );
        settings
    }
}
