use crate::service::BulkheadService;
use crate::Bulkhead;
use tower::Layer;

/// A Tower layer that limits concurrent calls through a shared [`Bulkhead`].
#[derive(Clone)]
pub struct BulkheadLayer {
    bulkhead: Bulkhead,
}

impl BulkheadLayer {
    pub(crate) fn new(bulkhead: Bulkhead) -> Self {
        Self { bulkhead }
    }

    /// The bulkhead shared by services built from this layer.
    pub fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }
}

impl<S> Layer<S> for BulkheadLayer {
    type Service = BulkheadService<S>;

    fn layer(&self, service: S) -> Self::Service {
        BulkheadService::new(service, self.bulkhead.clone())
    }
}
