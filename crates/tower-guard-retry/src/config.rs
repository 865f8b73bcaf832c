use crate::backoff::{ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, IntervalFunction};
use crate::events::RetryEvent;
use crate::policy::{RetryPolicy, RetryPredicate};
use crate::RetryLayer;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_guard_core::events::{BoxedEventListener, EventListeners, FnListener};

/// Invalid retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// At least one attempt is required.
    #[error("max attempts must be at least 1")]
    InvalidMaxAttempts,
}

/// Configuration for the retry middleware.
pub struct RetryConfig<E> {
    pub(crate) policy: RetryPolicy<E>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

impl<E> RetryConfig<E> {
    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }

    /// The retry policy.
    pub fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }

    /// Instance name used in events.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<E> {
    max_attempts: usize,
    interval_fn: Option<Arc<dyn IntervalFunction>>,
    retry_predicate: Option<RetryPredicate<E>>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RetryConfigBuilder<E> {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - max_attempts: 3
    /// - backoff: exponential from 100ms
    /// - predicate: retry every error
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            interval_fn: None,
            retry_predicate: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the maximum number of attempts.
    ///
    /// This includes the initial attempt, so `max_attempts(3)` means
    /// 1 initial attempt + 2 retries.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Waits the same duration between attempts.
    pub fn fixed_backoff(mut self, duration: Duration) -> Self {
        self.interval_fn = Some(Arc::new(FixedInterval::new(duration)));
        self
    }

    /// Doubles the delay after every failed attempt.
    pub fn exponential_backoff(mut self, initial_interval: Duration) -> Self {
        self.interval_fn = Some(Arc::new(ExponentialBackoff::new(initial_interval)));
        self
    }

    /// Exponential backoff with uniform jitter.
    ///
    /// The delay after attempt `n` is `base_delay * multiplier^(n-1)`, scaled
    /// randomly within `±randomization_factor` of itself.
    pub fn exponential_random_backoff(
        mut self,
        base_delay: Duration,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        self.interval_fn = Some(Arc::new(
            ExponentialRandomBackoff::new(base_delay, randomization_factor).multiplier(multiplier),
        ));
        self
    }

    /// Uses a custom interval function.
    pub fn backoff<I>(mut self, interval_fn: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        self.interval_fn = Some(Arc::new(interval_fn));
        self
    }

    /// Only errors matching `predicate` are retried; others end the call at once.
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Sets the name for this retry instance (used in events).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Attaches an event sink shared with other guards.
    pub fn event_listener(mut self, listener: BoxedEventListener<RetryEvent>) -> Self {
        self.event_listeners.add_shared(listener);
        self
    }

    /// Registers a callback invoked before each back-off sleep.
    ///
    /// Receives the number of the attempt that just failed (1-based) and the
    /// delay before the next one.
    ///
    /// ```rust,no_run
    /// use tower_guard_retry::RetryConfig;
    /// use std::time::Duration;
    ///
    /// let layer = RetryConfig::<std::io::Error>::builder()
    ///     .max_attempts(3)
    ///     .exponential_random_backoff(Duration::from_millis(200), 2.0, 0.5)
    ///     .on_retry(|attempt, delay| {
    ///         println!("attempt {} failed, retrying in {:?}", attempt, delay);
    ///     })
    ///     .build();
    /// ```
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback when a call succeeds; receives the attempt count.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when every attempt is used up.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Error { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when an error is not retryable.
    pub fn on_ignored_error<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::IgnoredError { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Validates the settings and returns the configuration.
    pub fn try_build_config(self) -> Result<RetryConfig<E>, ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts);
        }

        let interval_fn = self
            .interval_fn
            .unwrap_or_else(|| Arc::new(ExponentialBackoff::new(Duration::from_millis(100))));

        let mut policy = RetryPolicy::new(self.max_attempts, interval_fn);
        policy.retry_predicate = self.retry_predicate;

        Ok(RetryConfig {
            policy,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }

    /// Validates the settings and creates the layer.
    pub fn try_build(self) -> Result<RetryLayer<E>, ConfigError> {
        self.try_build_config().map(RetryLayer::new)
    }

    /// Creates the layer.
    ///
    /// # Panics
    ///
    /// Panics if `max_attempts` is zero; use [`try_build`](Self::try_build) to
    /// handle that case.
    pub fn build(self) -> RetryLayer<E> {
        match self.try_build() {
            Ok(layer) => layer,
            Err(e) => panic!("invalid retry configuration: {e}"),
        }
    }
}
