mod cancellation;

use std::time::Duration;
use tower::util::BoxCloneService;
use tower::{service_fn, Layer};
use tower_guard_bulkhead::{Bulkhead, BulkheadConfig};
use tower_guard_core::ResilienceError;

pub(crate) type TestError = ResilienceError<&'static str>;

pub(crate) fn bulkhead(max: usize, wait: Duration) -> Bulkhead {
    BulkheadConfig::builder()
        .name("downstreamA")
        .max_concurrent_calls(max)
        .max_wait_duration(wait)
        .build()
}

/// A service that holds its bulkhead slot for `hold`.
pub(crate) fn slow(bulkhead: &Bulkhead, hold: Duration) -> BoxCloneService<(), (), TestError> {
    BoxCloneService::new(bulkhead.layer().layer(service_fn(move |()| async move {
        tokio::time::sleep(hold).await;
        Ok::<_, TestError>(())
    })))
}
