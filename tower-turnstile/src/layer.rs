use std::sync::Arc;

use tower::Layer;
use turnstile::Strategy;

use crate::service::AdmissionService;

/// Applies per-key admission control to requests.
#[derive(Debug)]
pub struct AdmissionLayer<L, K>
where
    L: ?Sized,
{
    limiter: Arc<L>,
    extractor: K,
}

impl<L, K> Clone for AdmissionLayer<L, K>
where
    L: ?Sized,
    K: Clone,
{
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
            extractor: self.extractor.clone(),
        }
    }
}

impl<L, K> AdmissionLayer<L, K>
where
    L: Strategy + ?Sized,
{
    /// Create an AdmissionLayer.
    ///
    /// Every service produced by this layer shares `limiter`, so quotas are
    /// enforced across all of them.
    pub fn new(limiter: Arc<L>, extractor: K) -> Self {
        AdmissionLayer { limiter, extractor }
    }
}

impl<L, K, S> Layer<S> for AdmissionLayer<L, K>
where
    L: ?Sized,
    K: Clone,
{
    type Service = AdmissionService<L, K, S>;

    fn layer(&self, service: S) -> Self::Service {
        AdmissionService::new(service, self.limiter.clone(), self.extractor.clone())
    }
}
