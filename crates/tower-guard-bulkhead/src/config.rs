use crate::error::ConfigError;
use crate::events::BulkheadEvent;
use crate::Bulkhead;
use std::time::Duration;
use tokio::sync::Semaphore;
use tower_guard_core::events::{BoxedEventListener, EventListeners, FnListener};

/// Configuration for the bulkhead pattern.
#[derive(Debug, Clone)]
pub struct BulkheadConfig {
    pub(crate) max_concurrent_calls: usize,
    pub(crate) max_wait_duration: Duration,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<BulkheadEvent>,
}

impl BulkheadConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BulkheadConfigBuilder {
        BulkheadConfigBuilder::new()
    }

    /// Maximum number of calls in flight.
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_concurrent_calls
    }

    /// How long a caller waits for a permit; zero means no waiting.
    pub fn max_wait_duration(&self) -> Duration {
        self.max_wait_duration
    }

    /// Instance name used in events and errors.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`BulkheadConfig`].
pub struct BulkheadConfigBuilder {
    max_concurrent_calls: usize,
    max_wait_duration: Duration,
    name: String,
    event_listeners: EventListeners<BulkheadEvent>,
}

impl BulkheadConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            max_concurrent_calls: 25,
            max_wait_duration: Duration::ZERO,
            name: String::from("<unnamed>"),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the maximum number of concurrent calls.
    ///
    /// Default: 25
    pub fn max_concurrent_calls(mut self, max: usize) -> Self {
        self.max_concurrent_calls = max;
        self
    }

    /// Sets how long a call may wait for a free permit.
    ///
    /// `Duration::ZERO` rejects immediately when the bulkhead is full.
    ///
    /// Default: `Duration::ZERO`
    pub fn max_wait_duration(mut self, duration: Duration) -> Self {
        self.max_wait_duration = duration;
        self
    }

    /// Sets the name of this bulkhead instance.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attaches an event sink shared with other guards.
    pub fn event_listener(mut self, listener: BoxedEventListener<BulkheadEvent>) -> Self {
        self.event_listeners.add_shared(listener);
        self
    }

    /// Registers a callback when a permit is handed out.
    ///
    /// Receives the number of calls in flight including this one.
    ///
    /// ```rust,no_run
    /// use tower_guard_bulkhead::BulkheadConfig;
    ///
    /// let bulkhead = BulkheadConfig::builder()
    ///     .max_concurrent_calls(10)
    ///     .on_call_permitted(|concurrent| {
    ///         if concurrent >= 8 {
    ///             println!("bulkhead near capacity: {} in flight", concurrent);
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallPermitted {
                concurrent_calls, ..
            } = event
            {
                f(*concurrent_calls);
            }
        }));
        self
    }

    /// Registers a callback when a call is rejected.
    ///
    /// Receives the configured capacity.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallRejected {
                max_concurrent_calls,
                ..
            } = event
            {
                f(*max_concurrent_calls);
            }
        }));
        self
    }

    /// Registers a callback when a guarded call finishes successfully.
    pub fn on_call_finished<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallFinished { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback when a guarded call fails.
    pub fn on_call_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallFailed { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Validates the settings and returns the configuration.
    pub fn try_build_config(self) -> Result<BulkheadConfig, ConfigError> {
        if self.max_concurrent_calls == 0 {
            return Err(ConfigError::InvalidMaxConcurrentCalls);
        }
        if self.max_concurrent_calls > Semaphore::MAX_PERMITS {
            return Err(ConfigError::TooManyConcurrentCalls {
                requested: self.max_concurrent_calls,
                max: Semaphore::MAX_PERMITS,
            });
        }
        Ok(BulkheadConfig {
            max_concurrent_calls: self.max_concurrent_calls,
            max_wait_duration: self.max_wait_duration,
            name: self.name,
            event_listeners: self.event_listeners,
        })
    }

    /// Validates the settings and creates the bulkhead.
    pub fn try_build(self) -> Result<Bulkhead, ConfigError> {
        self.try_build_config().map(Bulkhead::new)
    }

    /// Creates the bulkhead.
    ///
    /// # Panics
    ///
    /// Panics if `max_concurrent_calls` is zero or above
    /// [`Semaphore::MAX_PERMITS`].
    pub fn build(self) -> Bulkhead {
        match self.try_build() {
            Ok(bulkhead) => bulkhead,
            Err(e) => panic!("invalid bulkhead configuration: {e}"),
        }
    }
}

impl Default for BulkheadConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
