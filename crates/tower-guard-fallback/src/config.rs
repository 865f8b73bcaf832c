//! Configuration for the fallback service.

use crate::{FallbackEvent, FallbackLayer};
use std::sync::Arc;
use tower_guard_core::{BoxedEventListener, EventListeners, FnListener};

/// Predicate selecting the errors a handler deals with.
pub type HandlePredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Function producing a substitute value for a matched error.
pub type ResolveFn<Res, E> = Arc<dyn Fn(&E) -> Res + Send + Sync>;

/// One entry in the ordered handler chain.
pub struct FallbackHandler<Res, E> {
    pub(crate) name: String,
    pub(crate) predicate: HandlePredicate<E>,
    pub(crate) resolve: ResolveFn<Res, E>,
}

impl<Res, E> FallbackHandler<Res, E> {
    /// The handler's name, reported in [`FallbackEvent::Applied`].
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if this handler deals with `error`.
    pub fn matches(&self, error: &E) -> bool {
        (self.predicate)(error)
    }
}

impl<Res, E> Clone for FallbackHandler<Res, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            predicate: Arc::clone(&self.predicate),
            resolve: Arc::clone(&self.resolve),
        }
    }
}

/// Configuration for the fallback service.
pub struct FallbackConfig<Res, E> {
    pub(crate) name: String,
    pub(crate) handlers: Vec<FallbackHandler<Res, E>>,
    pub(crate) event_listeners: EventListeners<FallbackEvent>,
}

impl<Res, E> FallbackConfig<Res, E> {
    /// Creates a new configuration builder.
    pub fn builder() -> FallbackConfigBuilder<Res, E> {
        FallbackConfigBuilder::new()
    }

    /// Instance name used in events and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handlers in the order they are tried.
    pub fn handlers(&self) -> &[FallbackHandler<Res, E>] {
        &self.handlers
    }

    /// The first handler matching `error`.
    pub fn resolve(&self, error: &E) -> Option<(&str, Res)> {
        self.handlers
            .iter()
            .find(|h| h.matches(error))
            .map(|h| (h.name(), (h.resolve)(error)))
    }
}

/// Builder for constructing a [`FallbackLayer`].
///
/// Handlers are tried in the order they are added, so add the most specific
/// first.
pub struct FallbackConfigBuilder<Res, E> {
    name: String,
    handlers: Vec<FallbackHandler<Res, E>>,
    event_listeners: EventListeners<FallbackEvent>,
}

impl<Res, E> Default for FallbackConfigBuilder<Res, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Res, E> FallbackConfigBuilder<Res, E> {
    /// Creates a new builder with no handlers.
    pub fn new() -> Self {
        Self {
            name: "fallback".to_string(),
            handlers: Vec::new(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name for this fallback instance (used in metrics and events).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Appends a handler computing a substitute from the error.
    pub fn handler<P, F>(mut self, name: impl Into<String>, predicate: P, resolve: F) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        F: Fn(&E) -> Res + Send + Sync + 'static,
    {
        self.handlers.push(FallbackHandler {
            name: name.into(),
            predicate: Arc::new(predicate),
            resolve: Arc::new(resolve),
        });
        self
    }

    /// Appends a handler returning a fixed value.
    pub fn value_on<P>(self, name: impl Into<String>, predicate: P, value: Res) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        Res: Clone + Send + Sync + 'static,
    {
        self.handler(name, predicate, move |_| value.clone())
    }

    /// Attaches an event sink shared with other guards.
    pub fn event_listener(mut self, listener: BoxedEventListener<FallbackEvent>) -> Self {
        self.event_listeners.add_shared(listener);
        self
    }

    /// Adds an event listener.
    pub fn on_event<F>(mut self, listener: F) -> Self
    where
        F: Fn(&FallbackEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(listener));
        self
    }

    /// Registers a callback run with the handler name when a fallback applies.
    pub fn on_applied<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let FallbackEvent::Applied { handler, .. } = event {
                f(handler);
            }
        }));
        self
    }

    /// Returns the configuration without wrapping it in a layer.
    pub fn build_config(self) -> FallbackConfig<Res, E> {
        FallbackConfig {
            name: self.name,
            handlers: self.handlers,
            event_listeners: self.event_listeners,
        }
    }

    /// Builds the fallback layer.
    pub fn build(self) -> FallbackLayer<Res, E> {
        FallbackLayer::new(self.build_config())
    }
}
