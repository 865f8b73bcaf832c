mod predicate;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::service_fn;
use tower::util::BoxCloneService;
use tower_guard::{DownstreamError, GuardError};
use tower_guard_core::ResilienceError;

pub(crate) type Scripted = BoxCloneService<(), &'static str, GuardError>;

/// Answers with `responses` in order, then "OK". Returns the call counter.
pub(crate) fn scripted(
    responses: Vec<Result<&'static str, DownstreamError>>,
) -> (Scripted, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let queue = Arc::new(Mutex::new(VecDeque::from(responses)));

    let counter = Arc::clone(&calls);
    let svc = service_fn(move |()| {
        counter.fetch_add(1, Ordering::SeqCst);
        let next = queue.lock().unwrap().pop_front().unwrap_or(Ok("OK"));
        async move { next.map_err(ResilienceError::Application) }
    });
    (BoxCloneService::new(svc), calls)
}

pub(crate) fn unavailable() -> Result<&'static str, DownstreamError> {
    Err(DownstreamError::remote(503, "unavailable"))
}
