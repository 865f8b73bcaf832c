//! Count-based sliding window of call outcomes.

use std::collections::VecDeque;

/// Outcome of one completed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CallOutcome {
    /// The call succeeded.
    Success,
    /// The call failed (as decided by the failure classifier).
    Failure,
}

/// Fixed-capacity ring of the last `capacity` call outcomes.
///
/// Keeps running totals so that recording and rate computation are O(1).
/// Invariant: `len() <= capacity()` and `failures() <= len()`.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    outcomes: VecDeque<CallOutcome>,
    capacity: usize,
    failures: usize,
}

impl SlidingWindow {
    /// Creates an empty window holding at most `capacity` outcomes.
    ///
    /// A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            outcomes: VecDeque::with_capacity(capacity),
            capacity,
            failures: 0,
        }
    }

    /// Appends an outcome, evicting the oldest one when the window is full.
    pub fn record(&mut self, outcome: CallOutcome) {
        if self.outcomes.len() == self.capacity {
            if let Some(CallOutcome::Failure) = self.outcomes.pop_front() {
                self.failures -= 1;
            }
        }
        if outcome == CallOutcome::Failure {
            self.failures += 1;
        }
        self.outcomes.push_back(outcome);
    }

    /// Returns the failure rate in `[0.0, 1.0]`, or `None` while fewer than
    /// `minimum_number_of_calls` outcomes have been recorded.
    ///
    /// `None` means "not enough data": the threshold must not be evaluated yet.
    pub fn failure_rate(&self, minimum_number_of_calls: usize) -> Option<f64> {
        let total = self.outcomes.len();
        if total == 0 || total < minimum_number_of_calls {
            return None;
        }
        Some(self.failures as f64 / total as f64)
    }

    /// Forgets every recorded outcome.
    pub fn clear(&mut self) {
        self.outcomes.clear();
        self.failures = 0;
    }

    /// Number of outcomes currently recorded.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of recorded failures.
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Number of recorded successes.
    pub fn successes(&self) -> usize {
        self.outcomes.len() - self.failures
    }

    /// Maximum number of outcomes kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
