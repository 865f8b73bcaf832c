use crate::error::ConfigError;
use crate::events::CircuitBreakerEvent;
use crate::{CircuitBreaker, CircuitState};
use std::time::Duration;
use tower_guard_core::{BoxedEventListener, EventListeners, FnListener};

/// Configuration for the circuit breaker pattern.
///
/// Built through [`CircuitBreakerConfigBuilder`]; fully static once built.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub(crate) sliding_window_size: usize,
    pub(crate) minimum_number_of_calls: usize,
    pub(crate) failure_rate_threshold: f32,
    pub(crate) wait_duration_in_open_state: Duration,
    pub(crate) permitted_number_of_calls_in_half_open_state: usize,
    pub(crate) automatic_transition_from_open_to_half_open_enabled: bool,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Number of outcomes kept in the sliding window.
    pub fn sliding_window_size(&self) -> usize {
        self.sliding_window_size
    }

    /// Outcomes required before the failure rate is evaluated.
    pub fn minimum_number_of_calls(&self) -> usize {
        self.minimum_number_of_calls
    }

    /// Failure rate, in percent, at which the circuit opens.
    pub fn failure_rate_threshold(&self) -> f32 {
        self.failure_rate_threshold
    }

    /// How long the circuit stays open before probing.
    pub fn wait_duration_in_open_state(&self) -> Duration {
        self.wait_duration_in_open_state
    }

    /// Number of trial calls admitted while half-open.
    pub fn permitted_number_of_calls_in_half_open_state(&self) -> usize {
        self.permitted_number_of_calls_in_half_open_state
    }

    /// Whether a timer moves the circuit from open to half-open.
    pub fn automatic_transition_from_open_to_half_open_enabled(&self) -> bool {
        self.automatic_transition_from_open_to_half_open_enabled
    }

    /// Instance name used in events and errors.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for configuring and constructing a circuit breaker.
pub struct CircuitBreakerConfigBuilder {
    sliding_window_size: usize,
    minimum_number_of_calls: Option<usize>,
    failure_rate_threshold: f32,
    wait_duration_in_open_state: Duration,
    permitted_number_of_calls_in_half_open_state: usize,
    automatic_transition_from_open_to_half_open_enabled: bool,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            sliding_window_size: 100,
            minimum_number_of_calls: None,
            failure_rate_threshold: 50.0,
            wait_duration_in_open_state: Duration::from_secs(60),
            permitted_number_of_calls_in_half_open_state: 10,
            automatic_transition_from_open_to_half_open_enabled: false,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the number of most recent calls the failure rate is computed over.
    ///
    /// Default: 100
    pub fn sliding_window_size(mut self, size: usize) -> Self {
        self.sliding_window_size = size;
        self
    }

    /// Sets the minimum number of recorded calls before the failure rate is evaluated.
    ///
    /// Values larger than the window size are capped to the window size.
    ///
    /// Default: same as `sliding_window_size`
    pub fn minimum_number_of_calls(mut self, n: usize) -> Self {
        self.minimum_number_of_calls = Some(n);
        self
    }

    /// Sets the failure rate threshold, in percent, at which the circuit opens.
    ///
    /// Default: 50.0
    pub fn failure_rate_threshold(mut self, percent: f32) -> Self {
        self.failure_rate_threshold = percent;
        self
    }

    /// Sets how long the circuit stays open before allowing trial calls.
    ///
    /// Default: 60 seconds
    pub fn wait_duration_in_open_state(mut self, duration: Duration) -> Self {
        self.wait_duration_in_open_state = duration;
        self
    }

    /// Sets the number of trial calls permitted in the half-open state.
    ///
    /// Default: 10
    pub fn permitted_number_of_calls_in_half_open_state(mut self, n: usize) -> Self {
        self.permitted_number_of_calls_in_half_open_state = n;
        self
    }

    /// Enables a timer that moves the circuit from open to half-open once the
    /// wait duration elapses, without waiting for a call to arrive.
    ///
    /// Default: false
    pub fn automatic_transition_from_open_to_half_open_enabled(mut self, enabled: bool) -> Self {
        self.automatic_transition_from_open_to_half_open_enabled = enabled;
        self
    }

    /// Give this breaker a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Attaches an event sink shared with other guards.
    pub fn event_listener(mut self, listener: BoxedEventListener<CircuitBreakerEvent>) -> Self {
        self.event_listeners.add_shared(listener);
        self
    }

    /// Registers a callback when the circuit breaker transitions between states.
    ///
    /// # Example
    /// ```rust,no_run
    /// use tower_guard_circuitbreaker::{CircuitBreakerConfig, CircuitState};
    ///
    /// let breaker = CircuitBreakerConfig::builder()
    ///     .on_state_transition(|from, to| {
    ///         println!("Circuit breaker: {:?} -> {:?}", from, to);
    ///         if to == CircuitState::Open {
    ///             println!("WARNING: circuit opened - downstream degraded");
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback when a call is rejected without reaching the downstream.
    ///
    /// The callback receives the state the rejection happened in: `Open`, or
    /// `HalfOpen` once the trial quota is used up.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallRejected { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback when a successful call is recorded.
    ///
    /// The callback receives the elapsed time of the call.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::SuccessRecorded { elapsed, .. } = event {
                    f(*elapsed);
                }
            }));
        self
    }

    /// Registers a callback when a failed call is recorded.
    ///
    /// The callback receives the elapsed time and the rendered error.
    ///
    /// # Example
    /// ```rust,no_run
    /// use tower_guard_circuitbreaker::CircuitBreakerConfig;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let failures = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&failures);
    ///
    /// let breaker = CircuitBreakerConfig::builder()
    ///     .on_failure(move |elapsed, error| {
    ///         counter.fetch_add(1, Ordering::SeqCst);
    ///         println!("call failed after {:?}: {}", elapsed, error);
    ///     })
    ///     .build();
    /// ```
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration, &str) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded { elapsed, error, .. } = event {
                    f(*elapsed, error);
                }
            }));
        self
    }

    /// Validates the settings and returns the configuration.
    pub fn try_build_config(self) -> Result<CircuitBreakerConfig, ConfigError> {
        if self.sliding_window_size == 0 {
            return Err(ConfigError::InvalidWindowSize);
        }
        if !(self.failure_rate_threshold > 0.0 && self.failure_rate_threshold <= 100.0) {
            return Err(ConfigError::InvalidFailureRateThreshold(
                self.failure_rate_threshold,
            ));
        }
        if self.permitted_number_of_calls_in_half_open_state == 0 {
            return Err(ConfigError::InvalidPermittedCallsInHalfOpen);
        }
        let minimum_number_of_calls = self
            .minimum_number_of_calls
            .unwrap_or(self.sliding_window_size)
            .clamp(1, self.sliding_window_size);

        Ok(CircuitBreakerConfig {
            sliding_window_size: self.sliding_window_size,
            minimum_number_of_calls,
            failure_rate_threshold: self.failure_rate_threshold,
            wait_duration_in_open_state: self.wait_duration_in_open_state,
            permitted_number_of_calls_in_half_open_state: self
                .permitted_number_of_calls_in_half_open_state,
            automatic_transition_from_open_to_half_open_enabled: self
                .automatic_transition_from_open_to_half_open_enabled,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }

    /// Validates the settings and creates the circuit breaker.
    pub fn try_build(self) -> Result<CircuitBreaker, ConfigError> {
        self.try_build_config().map(CircuitBreaker::new)
    }

    /// Creates the circuit breaker.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid; use [`try_build`](Self::try_build)
    /// to handle that case.
    pub fn build(self) -> CircuitBreaker {
        match self.try_build() {
            Ok(breaker) => breaker,
            Err(e) => panic!("invalid circuit breaker configuration: {e}"),
        }
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
