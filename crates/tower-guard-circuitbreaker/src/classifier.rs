//! Failure classification for circuit breaker decisions.
//!
//! The [`FailureClassifier`] trait decides whether a completed call counts as
//! a failure in the sliding window.

use std::sync::Arc;

/// Decides whether a `Result<Res, Err>` is recorded as a failure.
pub trait FailureClassifier<Res, Err>: Send + Sync {
    /// Returns `true` if the result counts toward the failure rate.
    fn classify(&self, result: &Result<Res, Err>) -> bool;
}

/// Treats every `Err` as a failure and every `Ok` as a success.
///
/// ```rust
/// use tower_guard_circuitbreaker::classifier::{DefaultClassifier, FailureClassifier};
///
/// let classifier = DefaultClassifier;
/// assert!(!FailureClassifier::<&str, std::io::Error>::classify(&classifier, &Ok("ok")));
/// assert!(FailureClassifier::<&str, std::io::Error>::classify(&classifier, &Err(std::io::Error::other("down"))));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl<Res, Err> FailureClassifier<Res, Err> for DefaultClassifier {
    fn classify(&self, result: &Result<Res, Err>) -> bool {
        result.is_err()
    }
}

/// A classifier backed by a closure.
///
/// ```rust
/// use tower_guard_circuitbreaker::classifier::{FailureClassifier, FnClassifier};
///
/// // Only server errors count
/// let classifier = FnClassifier::new(|result: &Result<(), u16>| {
///     matches!(result, Err(status) if *status >= 500)
/// });
///
/// assert!(!classifier.classify(&Err(404)));
/// assert!(classifier.classify(&Err(503)));
/// ```
pub struct FnClassifier<F> {
    f: Arc<F>,
}

impl<F> Clone for FnClassifier<F> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<F> FnClassifier<F> {
    /// Wraps a closure as a classifier.
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F, Res, Err> FailureClassifier<Res, Err> for FnClassifier<F>
where
    F: Fn(&Result<Res, Err>) -> bool + Send + Sync,
{
    fn classify(&self, result: &Result<Res, Err>) -> bool {
        (self.f)(result)
    }
}

impl<F> std::fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnClassifier")
            .field("f", &"<closure>")
            .finish()
    }
}
