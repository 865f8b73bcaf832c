//! Guard events and the listeners that observe them.
//!
//! Each guard owns an [`EventListeners`] and hands it every decision it makes
//! (admitted, rejected, retried, state changed). Listeners only observe: they
//! return nothing, and a listener that panics is skipped without affecting the
//! guard or the listeners after it.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// An observable decision made by a guard.
pub trait ResilienceEvent: Send + Sync + fmt::Debug {
    /// Short snake_case tag, e.g. `"state_transition"` or `"call_rejected"`.
    fn event_type(&self) -> &'static str;

    fn timestamp(&self) -> Instant;

    /// Name of the guard instance that made the decision.
    fn guard_name(&self) -> &str;
}

/// Receives events of one kind.
pub trait EventListener<E: ResilienceEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

/// A listener that can be attached to several guards at once.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// The listeners attached to one guard, called in registration order.
#[derive(Clone)]
pub struct EventListeners<E: ResilienceEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: ResilienceEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Attaches a listener owned by this guard alone.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.add_shared(Arc::new(listener));
    }

    /// Attaches a listener that other guards may also hold.
    pub fn add_shared(&mut self, listener: BoxedEventListener<E>) {
        self.listeners.push(listener);
    }

    /// Delivers `event` to every listener.
    ///
    /// Must not be called while holding a guard's state lock.
    pub fn emit(&self, event: &E) {
        let panicked = self
            .listeners
            .iter()
            .filter(|listener| !deliver(listener.as_ref(), event))
            .count();

        #[cfg(feature = "tracing")]
        if panicked > 0 {
            tracing::warn!(
                guard = event.guard_name(),
                event = event.event_type(),
                panicked,
                "event listener panicked"
            );
        }
        #[cfg(not(feature = "tracing"))]
        let _ = panicked;
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

/// Returns false if the listener panicked.
fn deliver<E: ResilienceEvent>(listener: &dyn EventListener<E>, event: &E) -> bool {
    panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event))).is_ok()
}

impl<E: ResilienceEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ResilienceEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// Adapts a closure into an [`EventListener`].
///
/// Builder callbacks such as `on_state_transition` wrap their closure in one
/// of these and match on the event variant they care about.
pub struct FnListener<E, F> {
    callback: F,
    _event: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            _event: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: ResilienceEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.callback)(event)
    }
}
