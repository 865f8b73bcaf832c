use crate::error::ConfigError;
use crate::events::RateLimiterEvent;
use crate::RateLimiter;
use std::time::Duration;
use tower_guard_core::events::{BoxedEventListener, EventListeners, FnListener};

/// Configuration for the rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub(crate) limit_for_period: usize,
    pub(crate) limit_refresh_period: Duration,
    pub(crate) timeout_duration: Duration,
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
    pub(crate) name: String,
}

impl RateLimiterConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }

    /// Calls admitted per period.
    pub fn limit_for_period(&self) -> usize {
        self.limit_for_period
    }

    /// Length of a period.
    pub fn limit_refresh_period(&self) -> Duration {
        self.limit_refresh_period
    }

    /// How long a caller may wait for the next period.
    pub fn timeout_duration(&self) -> Duration {
        self.timeout_duration
    }

    /// Instance name used in events and errors.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder {
    limit_for_period: usize,
    limit_refresh_period: Duration,
    timeout_duration: Duration,
    event_listeners: EventListeners<RateLimiterEvent>,
    name: String,
}

impl RateLimiterConfigBuilder {
    /// Creates a new builder with default values.
    ///
    /// Defaults: 50 calls per 1 second period, 5 second timeout.
    pub fn new() -> Self {
        Self {
            limit_for_period: 50,
            limit_refresh_period: Duration::from_secs(1),
            timeout_duration: Duration::from_secs(5),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the number of calls admitted per period.
    pub fn limit_for_period(mut self, limit: usize) -> Self {
        self.limit_for_period = limit;
        self
    }

    /// Sets the period after which all tokens are restored.
    pub fn limit_refresh_period(mut self, period: Duration) -> Self {
        self.limit_refresh_period = period;
        self
    }

    /// Sets how long a caller may wait for the next period.
    ///
    /// `Duration::ZERO` rejects immediately once the period's tokens are used.
    pub fn timeout_duration(mut self, timeout: Duration) -> Self {
        self.timeout_duration = timeout;
        self
    }

    /// Sets the name for this rate limiter instance.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attaches an event sink shared with other guards.
    pub fn event_listener(mut self, listener: BoxedEventListener<RateLimiterEvent>) -> Self {
        self.event_listeners.add_shared(listener);
        self
    }

    /// Registers a callback when a token is taken; receives the time waited.
    pub fn on_permit_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::PermitAcquired { wait_duration, .. } = event {
                f(*wait_duration);
            }
        }));
        self
    }

    /// Registers a callback when a call is rejected; receives the configured timeout.
    ///
    /// ```rust,no_run
    /// use tower_guard_ratelimiter::RateLimiterConfig;
    /// use std::time::Duration;
    ///
    /// let limiter = RateLimiterConfig::builder()
    ///     .limit_for_period(2)
    ///     .timeout_duration(Duration::ZERO)
    ///     .on_permit_rejected(|timeout| {
    ///         println!("rate limited (timeout {:?})", timeout);
    ///     })
    ///     .build();
    /// ```
    pub fn on_permit_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::PermitRejected {
                timeout_duration, ..
            } = event
            {
                f(*timeout_duration);
            }
        }));
        self
    }

    /// Validates the settings and returns the configuration.
    pub fn try_build_config(self) -> Result<RateLimiterConfig, ConfigError> {
        if self.limit_for_period == 0 {
            return Err(ConfigError::InvalidLimitForPeriod);
        }
        if self.limit_refresh_period.is_zero() {
            return Err(ConfigError::InvalidRefreshPeriod);
        }
        Ok(RateLimiterConfig {
            limit_for_period: self.limit_for_period,
            limit_refresh_period: self.limit_refresh_period,
            timeout_duration: self.timeout_duration,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }

    /// Validates the settings and creates the rate limiter.
    pub fn try_build(self) -> Result<RateLimiter, ConfigError> {
        self.try_build_config().map(RateLimiter::new)
    }

    /// Creates the rate limiter.
    ///
    /// # Panics
    ///
    /// Panics on a zero limit or a zero refresh period.
    pub fn build(self) -> RateLimiter {
        match self.try_build() {
            Ok(limiter) => limiter,
            Err(e) => panic!("invalid rate limiter configuration: {e}"),
        }
    }
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
