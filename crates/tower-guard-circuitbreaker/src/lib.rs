//! Count-based circuit breaker for Tower services.
//!
//! A circuit breaker stops calling a downstream that keeps failing, and lets a
//! few trial calls through after a cool-down to find out whether it recovered.
//!
//! ## States
//! - **Closed**: calls flow through, outcomes go into a sliding window of the
//!   last `sliding_window_size` calls. Once at least `minimum_number_of_calls`
//!   outcomes are recorded and the failure rate reaches the threshold, the
//!   circuit opens.
//! - **Open**: calls are rejected with [`CircuitBreakerError::CallNotPermitted`]
//!   until `wait_duration_in_open_state` has elapsed.
//! - **Half-Open**: exactly `permitted_number_of_calls_in_half_open_state` trial
//!   calls are admitted. If all of them succeed the circuit closes; if any
//!   fails it opens again.
//!
//! ## Usage
//!
//! The [`CircuitBreaker`] handle is cheap to clone and shared by every service
//! built from it:
//!
//! ```rust
//! use tower_guard_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerError};
//! use tower::{ServiceBuilder, service_fn};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Rejected,
//!     Failed,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl From<CircuitBreakerError> for MyError {
//!     fn from(_: CircuitBreakerError) -> Self {
//!         MyError::Rejected
//!     }
//! }
//!
//! # async fn example() {
//! let breaker = CircuitBreakerConfig::builder()
//!     .name("downstreamA")
//!     .sliding_window_size(10)
//!     .failure_rate_threshold(50.0)
//!     .wait_duration_in_open_state(Duration::from_secs(5))
//!     .permitted_number_of_calls_in_half_open_state(3)
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(breaker.layer())
//!     .service(service_fn(|req: String| async move { Ok::<_, MyError>(req) }));
//! # }
//! ```
//!
//! ## Manual control
//!
//! ```rust
//! use tower_guard_circuitbreaker::{CircuitBreakerConfig, CircuitState};
//!
//! let breaker = CircuitBreakerConfig::builder().build();
//! breaker.transition_to_open();
//! assert_eq!(breaker.state(), CircuitState::Open);
//! assert!(breaker.try_acquire().is_err());
//!
//! breaker.reset();
//! assert_eq!(breaker.state(), CircuitState::Closed);
//! ```
//!
//! ## Automatic transition
//!
//! With `automatic_transition_from_open_to_half_open_enabled(true)` a Tokio
//! timer moves the circuit to half-open when the wait elapses. Without it (or
//! outside a Tokio runtime) the move happens on the first admission attempt
//! after the wait.
//!
//! ## Features
//! - `metrics`: emits call counters, transition counters and a state gauge
//! - `tracing`: logs transitions and rejections
//! - `serde`: derives `Serialize` for [`CircuitState`] and [`CircuitMetrics`]

use crate::circuit::{Admission, Circuit, Transition};
use crate::window::CallOutcome;
#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::time::{Duration, Instant as StdInstant};
use tokio::time::Instant;

pub use circuit::{CircuitMetrics, CircuitState};
pub use classifier::{DefaultClassifier, FailureClassifier, FnClassifier};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::{CircuitBreakerError, ConfigError};
pub use events::CircuitBreakerEvent;
pub use layer::CircuitBreakerLayer;
pub use service::CircuitBreakerService;

mod circuit;
pub mod classifier;
mod config;
mod error;
mod events;
mod layer;
mod service;
pub mod window;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

#[cfg(feature = "metrics")]
fn describe_metrics() {
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "circuitbreaker_calls_total",
            "Total number of calls through the circuit breaker"
        );
        describe_counter!(
            "circuitbreaker_transitions_total",
            "Total number of circuit breaker state transitions"
        );
        describe_gauge!(
            "circuitbreaker_state",
            "Current state of the circuit breaker (0 = closed, 1 = open, 2 = half-open)"
        );
        describe_histogram!(
            "circuitbreaker_call_duration_seconds",
            "Duration of calls through the circuit breaker"
        );
    });
}

struct Shared {
    config: CircuitBreakerConfig,
    circuit: Mutex<Circuit>,
    state: Arc<AtomicU8>,
}

/// A shareable circuit breaker.
///
/// All clones observe and mutate the same circuit.
#[derive(Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

impl CircuitBreaker {
    /// Creates a circuit breaker from a validated configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        #[cfg(feature = "metrics")]
        describe_metrics();

        let state = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        let circuit = Circuit::new(&config, Arc::clone(&state));
        Self {
            shared: Arc::new(Shared {
                config,
                circuit: Mutex::new(circuit),
                state,
            }),
        }
    }

    /// The breaker's name.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// The configuration this breaker was built with.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.shared.config
    }

    /// Returns the current state without taking the lock.
    ///
    /// Reading the state never causes a transition: an open circuit whose wait
    /// has elapsed still reports `Open` until a call or the timer moves it.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Returns true if the circuit is currently open.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Snapshot of the breaker's counters.
    pub fn metrics(&self) -> CircuitMetrics {
        self.lock().metrics(&self.shared.config, Instant::now())
    }

    /// Asks for permission to make one call.
    ///
    /// The returned permit must be completed with [`CallPermit::record_success`]
    /// or [`CallPermit::record_failure`]. Dropping it without recording gives a
    /// half-open trial slot back.
    pub fn try_acquire(&self) -> Result<CallPermit, CircuitBreakerError> {
        let (admission, transition) = self
            .lock()
            .try_acquire(&self.shared.config, Instant::now());

        if let Some(transition) = transition {
            self.publish_transition(transition);
        }

        match admission {
            Admission::Permitted { epoch, state } => {
                self.emit(CircuitBreakerEvent::CallPermitted {
                    guard_name: self.name().to_string(),
                    timestamp: StdInstant::now(),
                    state,
                });

                #[cfg(feature = "tracing")]
                tracing::trace!(breaker = self.name(), state = %state, "call permitted");

                Ok(CallPermit {
                    breaker: self.clone(),
                    epoch,
                    state,
                    recorded: false,
                })
            }
            Admission::Rejected { state } => {
                self.emit(CircuitBreakerEvent::CallRejected {
                    guard_name: self.name().to_string(),
                    timestamp: StdInstant::now(),
                    state,
                });

                #[cfg(feature = "tracing")]
                tracing::debug!(breaker = self.name(), state = %state, "call not permitted");

                #[cfg(feature = "metrics")]
                counter!("circuitbreaker_calls_total", "circuitbreaker" => self.name().to_string(), "outcome" => "rejected").increment(1);

                Err(CircuitBreakerError::CallNotPermitted {
                    name: self.name().to_string(),
                    state,
                })
            }
        }
    }

    /// Forces the circuit open. The wait duration starts now.
    pub fn transition_to_open(&self) {
        self.force(CircuitState::Open);
    }

    /// Forces the circuit into half-open with a fresh trial quota.
    pub fn transition_to_half_open(&self) {
        self.force(CircuitState::HalfOpen);
    }

    /// Forces the circuit closed with an empty window.
    pub fn transition_to_closed(&self) {
        self.force(CircuitState::Closed);
    }

    /// Returns to a closed circuit with an empty window, discarding the
    /// outcomes of calls still in flight.
    pub fn reset(&self) {
        let transition = self.lock().reset(Instant::now());
        if let Some(transition) = transition {
            self.publish_transition(transition);
        }
    }

    /// Creates a Tower layer that guards services with this breaker.
    pub fn layer(&self) -> CircuitBreakerLayer {
        CircuitBreakerLayer::new(self.clone())
    }

    fn force(&self, state: CircuitState) {
        let transition = self.lock().transition_to(state, Instant::now());
        if let Some(transition) = transition {
            self.publish_transition(transition);
        }
    }

    fn record(
        &self,
        epoch: u64,
        state: CircuitState,
        outcome: CallOutcome,
        elapsed: Duration,
        error: Option<String>,
    ) {
        let event = match error {
            Some(error) => CircuitBreakerEvent::FailureRecorded {
                guard_name: self.name().to_string(),
                timestamp: StdInstant::now(),
                state,
                elapsed,
                error,
            },
            None => CircuitBreakerEvent::SuccessRecorded {
                guard_name: self.name().to_string(),
                timestamp: StdInstant::now(),
                state,
                elapsed,
            },
        };

        #[cfg(feature = "metrics")]
        {
            let label = match outcome {
                CallOutcome::Success => "success",
                CallOutcome::Failure => "failure",
            };
            counter!("circuitbreaker_calls_total", "circuitbreaker" => self.name().to_string(), "outcome" => label).increment(1);
            histogram!("circuitbreaker_call_duration_seconds", "circuitbreaker" => self.name().to_string())
                .record(elapsed.as_secs_f64());
        }

        let transition = self
            .lock()
            .record(epoch, outcome, &self.shared.config, Instant::now());

        self.emit(event);
        if let Some(transition) = transition {
            self.publish_transition(transition);
        }
    }

    fn release(&self, epoch: u64) {
        self.lock().release(epoch);
    }

    fn publish_transition(&self, transition: Transition) {
        #[cfg(feature = "tracing")]
        tracing::info!(
            breaker = self.name(),
            from = %transition.from,
            to = %transition.to,
            "circuit state transition"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => self.name().to_string(),
                "from" => transition.from.as_str(),
                "to" => transition.to.as_str()
            )
            .increment(1);
            gauge!("circuitbreaker_state", "circuitbreaker" => self.name().to_string())
                .set(transition.to as u8 as f64);
        }

        self.emit(CircuitBreakerEvent::StateTransition {
            guard_name: self.name().to_string(),
            timestamp: StdInstant::now(),
            from_state: transition.from,
            to_state: transition.to,
        });

        if transition.to == CircuitState::Open
            && self
                .shared
                .config
                .automatic_transition_from_open_to_half_open_enabled
        {
            self.schedule_half_open(transition.epoch);
        }
    }

    /// Spawns a timer that moves the circuit to half-open once the wait
    /// elapses, unless another transition happened first.
    fn schedule_half_open(&self, epoch: u64) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let deadline = match self.lock().open_deadline(&self.shared.config) {
            Some(deadline) => deadline,
            None => return,
        };
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);

        handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let breaker = CircuitBreaker { shared };
            let transition = {
                let mut circuit = breaker.lock();
                if circuit.epoch() != epoch || circuit.state() != CircuitState::Open {
                    return;
                }
                circuit.transition_to(CircuitState::HalfOpen, Instant::now())
            };
            if let Some(transition) = transition {
                breaker.publish_transition(transition);
            }
        });
    }

    fn emit(&self, event: CircuitBreakerEvent) {
        self.shared.config.event_listeners.emit(&event);
    }

    fn lock(&self) -> MutexGuard<'_, Circuit> {
        // Listeners run outside the lock, so a poisoned lock only means a
        // panic between two plain field updates.
        self.shared
            .circuit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

/// Permission to make one call through the breaker.
///
/// Report the outcome with [`record_success`](Self::record_success) or
/// [`record_failure`](Self::record_failure). A permit dropped without a
/// report counts as neither.
#[must_use = "an unreported permit does not count toward the failure rate"]
pub struct CallPermit {
    breaker: CircuitBreaker,
    epoch: u64,
    state: CircuitState,
    recorded: bool,
}

impl CallPermit {
    /// State the call was admitted in.
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Records a successful call.
    pub fn record_success(mut self, elapsed: Duration) {
        self.recorded = true;
        self.breaker
            .record(self.epoch, self.state, CallOutcome::Success, elapsed, None);
    }

    /// Records a failed call.
    pub fn record_failure(mut self, elapsed: Duration, error: impl fmt::Display) {
        self.recorded = true;
        self.breaker.record(
            self.epoch,
            self.state,
            CallOutcome::Failure,
            elapsed,
            Some(error.to_string()),
        );
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if !self.recorded {
            self.breaker.release(self.epoch);
        }
    }
}

impl fmt::Debug for CallPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallPermit")
            .field("breaker", &self.breaker.name())
            .field("state", &self.state)
            .finish()
    }
}
