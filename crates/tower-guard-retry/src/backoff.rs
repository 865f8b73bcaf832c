//! Backoff strategies for retry delays.
//!
//! An [`IntervalFunction`] maps the zero-based retry index (0 = the delay after
//! the first failed attempt) to the time to wait before the next attempt.

use std::time::Duration;

/// Computes the delay before the next attempt.
pub trait IntervalFunction: Send + Sync {
    /// Returns the delay to apply after the failed attempt `attempt + 1`.
    fn next_interval(&self, attempt: usize) -> Duration;
}

/// Waits the same duration between every attempt.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    duration: Duration,
}

impl FixedInterval {
    /// Creates a fixed backoff.
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _attempt: usize) -> Duration {
        self.duration
    }
}

/// `initial * multiplier^attempt`, optionally capped.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Option<Duration>,
}

impl ExponentialBackoff {
    /// Creates an exponential backoff with a multiplier of 2.
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            max_interval: None,
        }
    }

    /// Sets the growth factor.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Caps the computed delay.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }

    fn base_interval(&self, attempt: usize) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as usize) as i32);
        let interval = Duration::try_from_secs_f64(self.initial_interval.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX);

        match self.max_interval {
            Some(max) => interval.min(max),
            None => interval,
        }
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, attempt: usize) -> Duration {
        self.base_interval(attempt)
    }
}

/// Exponential backoff with uniform jitter.
///
/// The exponential delay `d` is scaled to a random value in
/// `[d * (1 - f), d * (1 + f)]` where `f` is the randomization factor, so
/// callers that failed together do not retry together.
///
/// ```rust
/// use tower_guard_retry::{ExponentialRandomBackoff, IntervalFunction};
/// use std::time::Duration;
///
/// let backoff = ExponentialRandomBackoff::new(Duration::from_millis(200), 0.5);
/// let first = backoff.next_interval(0);
/// assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(300));
/// ```
#[derive(Debug, Clone)]
pub struct ExponentialRandomBackoff {
    exponential: ExponentialBackoff,
    randomization_factor: f64,
}

impl ExponentialRandomBackoff {
    /// Default randomization factor.
    pub const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;

    /// Creates a jittered exponential backoff with a multiplier of 2.
    ///
    /// The randomization factor is clamped to `[0.0, 1.0]`.
    pub fn new(initial_interval: Duration, randomization_factor: f64) -> Self {
        Self {
            exponential: ExponentialBackoff::new(initial_interval),
            randomization_factor: randomization_factor.clamp(0.0, 1.0),
        }
    }

    /// Sets the growth factor.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.exponential = self.exponential.multiplier(multiplier);
        self
    }

    /// Caps the delay before jitter is applied.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.exponential = self.exponential.max_interval(max_interval);
        self
    }

    fn randomize(&self, duration: Duration) -> Duration {
        use rand::Rng;

        let secs = duration.as_secs_f64();
        let delta = secs * self.randomization_factor;
        if delta == 0.0 || !delta.is_finite() {
            return duration;
        }
        let randomized = rand::rng().random_range((secs - delta)..=(secs + delta));
        Duration::try_from_secs_f64(randomized.max(0.0)).unwrap_or(duration)
    }
}

impl IntervalFunction for ExponentialRandomBackoff {
    fn next_interval(&self, attempt: usize) -> Duration {
        self.randomize(self.exponential.base_interval(attempt))
    }
}

/// A backoff computed by a closure.
pub struct FnInterval<F> {
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    /// Wraps a closure as an interval function.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn next_interval(&self, attempt: usize) -> Duration {
        (self.f)(attempt)
    }
}
