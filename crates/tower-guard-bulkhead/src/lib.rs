//! Bulkhead pattern for Tower services.
//!
//! A bulkhead caps how many calls may be in flight at once so that one slow
//! dependency cannot exhaust the caller's resources. Calls beyond the cap
//! either wait up to `max_wait_duration` for a permit or, with a zero wait,
//! are rejected at once.
//!
//! ## Basic Example
//!
//! ```rust
//! use tower_guard_bulkhead::{BulkheadConfig, BulkheadError};
//! use tower::{ServiceBuilder, service_fn};
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Shed,
//! }
//!
//! impl From<BulkheadError> for MyError {
//!     fn from(_: BulkheadError) -> Self {
//!         MyError::Shed
//!     }
//! }
//!
//! # async fn example() {
//! let bulkhead = BulkheadConfig::builder()
//!     .name("downstreamA")
//!     .max_concurrent_calls(2)
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(bulkhead.layer())
//!     .service(service_fn(|req: String| async move { Ok::<_, MyError>(req) }));
//! # }
//! ```
//!
//! ## Permits
//!
//! [`Bulkhead::acquire`] hands out a [`BulkheadPermit`] that releases its slot
//! when dropped, whether the guarded call succeeds, fails, panics or is
//! cancelled. Waiters are served in FIFO order.

use std::fmt;
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};

mod config;
mod error;
mod events;
mod layer;
mod service;

pub use config::{BulkheadConfig, BulkheadConfigBuilder};
pub use error::{BulkheadError, ConfigError};
pub use events::BulkheadEvent;
pub use layer::BulkheadLayer;
pub use service::BulkheadService;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

struct Shared {
    config: BulkheadConfig,
    semaphore: Arc<Semaphore>,
}

/// A shareable concurrency limiter.
///
/// All clones draw permits from the same pool.
#[derive(Clone)]
pub struct Bulkhead {
    shared: Arc<Shared>,
}

impl Bulkhead {
    /// Creates a bulkhead from a validated configuration.
    pub fn new(config: BulkheadConfig) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "bulkhead_calls_permitted_total",
                "Calls that obtained a bulkhead permit"
            );
            describe_counter!(
                "bulkhead_calls_rejected_total",
                "Calls rejected by the bulkhead"
            );
            describe_gauge!("bulkhead_concurrent_calls", "Calls currently in flight");
        });

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_calls));
        Self {
            shared: Arc::new(Shared { config, semaphore }),
        }
    }

    /// The bulkhead's name.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// The configuration this bulkhead was built with.
    pub fn config(&self) -> &BulkheadConfig {
        &self.shared.config
    }

    /// Permits currently free.
    pub fn available_permits(&self) -> usize {
        self.shared.semaphore.available_permits()
    }

    /// Calls currently holding a permit.
    pub fn in_use(&self) -> usize {
        self.shared
            .config
            .max_concurrent_calls
            .saturating_sub(self.available_permits())
    }

    /// Takes a permit if one is free, without waiting.
    pub fn try_acquire(&self) -> Result<BulkheadPermit, BulkheadError> {
        match Arc::clone(&self.shared.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(self.permitted(permit)),
            Err(TryAcquireError::NoPermits) | Err(TryAcquireError::Closed) => {
                Err(self.rejected(None))
            }
        }
    }

    /// Takes a permit, waiting up to `max_wait_duration` for one to be released.
    ///
    /// Dropping the returned future while it waits leaves the permit count
    /// untouched.
    pub async fn acquire(&self) -> Result<BulkheadPermit, BulkheadError> {
        let max_wait = self.shared.config.max_wait_duration;

        match Arc::clone(&self.shared.semaphore).try_acquire_owned() {
            Ok(permit) => return Ok(self.permitted(permit)),
            Err(TryAcquireError::Closed) => return Err(self.rejected(None)),
            Err(TryAcquireError::NoPermits) if max_wait.is_zero() => {
                return Err(self.rejected(None))
            }
            Err(TryAcquireError::NoPermits) => {}
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(bulkhead = self.name(), ?max_wait, "waiting for bulkhead permit");

        let semaphore = Arc::clone(&self.shared.semaphore);
        match tokio::time::timeout(max_wait, semaphore.acquire_owned()).await {
            Ok(Ok(permit)) => Ok(self.permitted(permit)),
            Ok(Err(_)) => Err(self.rejected(None)),
            Err(_) => Err(self.rejected(Some(max_wait))),
        }
    }

    /// Creates a Tower layer that guards services with this bulkhead.
    pub fn layer(&self) -> BulkheadLayer {
        BulkheadLayer::new(self.clone())
    }

    fn permitted(&self, permit: OwnedSemaphorePermit) -> BulkheadPermit {
        let concurrent_calls = self.in_use();

        self.shared
            .config
            .event_listeners
            .emit(&BulkheadEvent::CallPermitted {
                guard_name: self.name().to_string(),
                timestamp: Instant::now(),
                concurrent_calls,
            });

        #[cfg(feature = "metrics")]
        {
            counter!("bulkhead_calls_permitted_total", "bulkhead" => self.name().to_string())
                .increment(1);
            gauge!("bulkhead_concurrent_calls", "bulkhead" => self.name().to_string())
                .set(concurrent_calls as f64);
        }

        BulkheadPermit {
            _permit: permit,
            bulkhead: self.clone(),
            acquired_at: Instant::now(),
        }
    }

    fn rejected(&self, waited: Option<std::time::Duration>) -> BulkheadError {
        let max_concurrent_calls = self.shared.config.max_concurrent_calls;

        #[cfg(feature = "tracing")]
        tracing::debug!(bulkhead = self.name(), max_concurrent_calls, "bulkhead full");

        self.shared
            .config
            .event_listeners
            .emit(&BulkheadEvent::CallRejected {
                guard_name: self.name().to_string(),
                timestamp: Instant::now(),
                max_concurrent_calls,
            });

        #[cfg(feature = "metrics")]
        counter!("bulkhead_calls_rejected_total", "bulkhead" => self.name().to_string())
            .increment(1);

        match waited {
            Some(max_wait) => BulkheadError::Timeout {
                name: self.name().to_string(),
                max_concurrent_calls,
                max_wait,
            },
            None => BulkheadError::BulkheadFull {
                name: self.name().to_string(),
                max_concurrent_calls,
            },
        }
    }
}

impl fmt::Debug for Bulkhead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bulkhead")
            .field("name", &self.name())
            .field("in_use", &self.in_use())
            .field("max_concurrent_calls", &self.shared.config.max_concurrent_calls)
            .finish()
    }
}

/// A held bulkhead slot. The slot is released when the permit is dropped.
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
    bulkhead: Bulkhead,
    acquired_at: Instant,
}

impl BulkheadPermit {
    /// Releases the slot and reports a successful call.
    pub fn finish(self) {
        let event = BulkheadEvent::CallFinished {
            guard_name: self.bulkhead.name().to_string(),
            timestamp: Instant::now(),
            duration: self.acquired_at.elapsed(),
        };
        self.report(event);
    }

    /// Releases the slot and reports a failed call.
    pub fn fail(self) {
        let event = BulkheadEvent::CallFailed {
            guard_name: self.bulkhead.name().to_string(),
            timestamp: Instant::now(),
            duration: self.acquired_at.elapsed(),
        };
        self.report(event);
    }

    fn report(self, event: BulkheadEvent) {
        let bulkhead = self.bulkhead.clone();
        drop(self);
        bulkhead.shared.config.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        gauge!("bulkhead_concurrent_calls", "bulkhead" => bulkhead.name().to_string())
            .set(bulkhead.in_use() as f64);
    }
}

impl fmt::Debug for BulkheadPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkheadPermit")
            .field("bulkhead", &self.bulkhead.name())
            .finish()
    }
}
