//! Core infrastructure for tower-guard.
//!
//! This crate provides functionality shared by every guard in the workspace:
//! - Event system for observability
//! - The unified [`ResilienceError`] that all guard rejections convert into

pub mod error;
pub mod events;

pub use error::ResilienceError;
pub use events::{BoxedEventListener, EventListener, EventListeners, FnListener, ResilienceEvent};
