//! Guarded calls to an unreliable downstream service.
//!
//! This crate wires the individual guards into the two call paths a client
//! needs and adds the pieces around them:
//!
//! - [`GuardedCall`]: a fixed-order guard stack (retry path or admission path)
//!   that runs an async operation and reports a substituted value as
//!   [`Outcome::Degraded`]
//! - [`ResilienceRegistry`]: shared guard instances by name
//! - [`GuardSettings`]: named profiles loaded from TOML
//! - [`LoggingListener`]: an event sink that logs guard events via `tracing`
//! - [`DownstreamClient`]: a client with a retry path and an admission path
//!
//! # Example
//!
//! ```rust
//! use tower_guard::{GuardSettings, ResilienceRegistry, DownstreamError};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ResilienceRegistry::from_settings(&GuardSettings::downstream_a())?;
//! let call = registry
//!     .retry_path::<String>(GuardSettings::DOWNSTREAM_A)
//!     .expect("downstreamA is registered");
//!
//! let outcome = call
//!     .call(|| async { Ok::<_, DownstreamError>("OK".to_string()) })
//!     .await?;
//! assert!(outcome.is_primary());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod downstream;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod settings;

pub use client::{Downstream, DownstreamClient, FALLBACK};
pub use downstream::{is_retryable, DownstreamError, GuardError};
pub use logging::LoggingListener;
pub use pipeline::GuardedCall;
pub use registry::{RegistryBuilder, ResilienceRegistry};
pub use settings::{GuardSettings, SettingsError};

pub use tower_guard_core::ResilienceError;
pub use tower_guard_fallback::Outcome;
