use crate::config::CircuitBreakerConfig;
use crate::window::{CallOutcome, SlidingWindow};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CircuitState {
    /// Calls flow through and their outcomes are recorded.
    Closed = 0,
    /// Calls are rejected without reaching the downstream.
    Open = 1,
    /// A limited number of trial calls decide whether to close or reopen.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    /// Upper-case label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time snapshot of the breaker's internal counters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CircuitMetrics {
    /// Current state.
    pub state: CircuitState,
    /// Outcomes currently held in the sliding window (closed state only).
    pub buffered_calls: usize,
    /// Failed outcomes in the sliding window.
    pub failed_calls: usize,
    /// Successful outcomes in the sliding window.
    pub successful_calls: usize,
    /// Failure rate in percent, or `None` below the minimum number of calls.
    pub failure_rate: Option<f32>,
    /// Trial calls admitted since entering half-open.
    pub half_open_permitted: usize,
    /// Trial calls that have reported back since entering half-open.
    pub half_open_completed: usize,
    /// Time since the last state transition.
    pub time_since_state_change: Duration,
}

/// A state change that happened while the circuit was locked.
///
/// Returned to the caller so that events are published after the lock is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub(crate) from: CircuitState,
    pub(crate) to: CircuitState,
    pub(crate) epoch: u64,
}

/// Result of asking the circuit for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Permitted { epoch: u64, state: CircuitState },
    Rejected { state: CircuitState },
}

#[derive(Debug, Default)]
struct HalfOpenTrials {
    issued: usize,
    completed: usize,
    failures: usize,
}

/// The breaker's state machine.
///
/// Every transition bumps `epoch`; outcomes tagged with an older epoch belong
/// to calls admitted in a previous state and are discarded.
#[derive(Debug)]
pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    epoch: u64,
    window: SlidingWindow,
    trials: HalfOpenTrials,
    opened_at: Option<Instant>,
    last_state_change: Instant,
}

impl Circuit {
    pub(crate) fn new(config: &CircuitBreakerConfig, state_atomic: Arc<AtomicU8>) -> Self {
        state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
        Self {
            state: CircuitState::Closed,
            state_atomic,
            epoch: 0,
            window: SlidingWindow::new(config.sliding_window_size),
            trials: HalfOpenTrials::default(),
            opened_at: None,
            last_state_change: Instant::now(),
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Instant at which an open circuit may start probing.
    pub(crate) fn open_deadline(&self, config: &CircuitBreakerConfig) -> Option<Instant> {
        match self.state {
            CircuitState::Open => self
                .opened_at
                .map(|at| at + config.wait_duration_in_open_state),
            _ => None,
        }
    }

    /// Admits or rejects one call.
    ///
    /// An open circuit whose wait has elapsed moves to half-open first, so the
    /// returned transition (if any) must be published by the caller.
    pub(crate) fn try_acquire(
        &mut self,
        config: &CircuitBreakerConfig,
        now: Instant,
    ) -> (Admission, Option<Transition>) {
        let mut transition = None;

        if self.state == CircuitState::Open {
            match self.open_deadline(config) {
                Some(deadline) if now >= deadline => {
                    transition = self.transition_to(CircuitState::HalfOpen, now);
                }
                _ => {
                    return (
                        Admission::Rejected {
                            state: CircuitState::Open,
                        },
                        None,
                    )
                }
            }
        }

        let admission = match self.state {
            CircuitState::Closed => Admission::Permitted {
                epoch: self.epoch,
                state: CircuitState::Closed,
            },
            CircuitState::HalfOpen => {
                if self.trials.issued < config.permitted_number_of_calls_in_half_open_state {
                    self.trials.issued += 1;
                    Admission::Permitted {
                        epoch: self.epoch,
                        state: CircuitState::HalfOpen,
                    }
                } else {
                    Admission::Rejected {
                        state: CircuitState::HalfOpen,
                    }
                }
            }
            CircuitState::Open => Admission::Rejected {
                state: CircuitState::Open,
            },
        };

        (admission, transition)
    }

    /// Records the outcome of a call admitted under `epoch`.
    pub(crate) fn record(
        &mut self,
        epoch: u64,
        outcome: CallOutcome,
        config: &CircuitBreakerConfig,
        now: Instant,
    ) -> Option<Transition> {
        if epoch != self.epoch {
            return None;
        }

        match self.state {
            CircuitState::Closed => {
                self.window.record(outcome);
                let rate = self.window.failure_rate(config.minimum_number_of_calls)?;
                if rate * 100.0 >= f64::from(config.failure_rate_threshold) {
                    self.transition_to(CircuitState::Open, now)
                } else {
                    None
                }
            }
            CircuitState::HalfOpen => {
                self.trials.completed += 1;
                if outcome == CallOutcome::Failure {
                    self.trials.failures += 1;
                }
                if self.trials.completed < config.permitted_number_of_calls_in_half_open_state {
                    return None;
                }
                if self.trials.failures == 0 {
                    self.transition_to(CircuitState::Closed, now)
                } else {
                    self.transition_to(CircuitState::Open, now)
                }
            }
            CircuitState::Open => None,
        }
    }

    /// Gives back a half-open trial slot whose call never reported an outcome.
    pub(crate) fn release(&mut self, epoch: u64) {
        if epoch == self.epoch
            && self.state == CircuitState::HalfOpen
            && self.trials.issued > self.trials.completed
        {
            self.trials.issued -= 1;
        }
    }

    /// Moves to `state`, clearing all per-state bookkeeping.
    ///
    /// Returns `None` if the circuit is already in `state`.
    pub(crate) fn transition_to(&mut self, state: CircuitState, now: Instant) -> Option<Transition> {
        if self.state == state {
            return None;
        }

        let from = self.state;
        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.epoch += 1;
        self.window.clear();
        self.trials = HalfOpenTrials::default();
        self.opened_at = (state == CircuitState::Open).then_some(now);
        self.last_state_change = now;

        Some(Transition {
            from,
            to: state,
            epoch: self.epoch,
        })
    }

    /// Returns to a fresh closed circuit, even when already closed.
    pub(crate) fn reset(&mut self, now: Instant) -> Option<Transition> {
        let transition = self.transition_to(CircuitState::Closed, now);
        if transition.is_none() {
            self.epoch += 1;
            self.window.clear();
            self.last_state_change = now;
        }
        transition
    }

    pub(crate) fn metrics(&self, config: &CircuitBreakerConfig, now: Instant) -> CircuitMetrics {
        CircuitMetrics {
            state: self.state,
            buffered_calls: self.window.len(),
            failed_calls: self.window.failures(),
            successful_calls: self.window.successes(),
            failure_rate: self
                .window
                .failure_rate(config.minimum_number_of_calls)
                .map(|rate| (rate * 100.0) as f32),
            half_open_permitted: self.trials.issued,
            half_open_completed: self.trials.completed,
            time_since_state_change: now.saturating_duration_since(self.last_state_change),
        }
    }
}
