use std::sync::Arc;

use tower::ServiceBuilder;
use tower::layer::util::Stack;

use turnstile::Strategy;

use crate::AdmissionLayer;

/// Service Builder Extension with additional useful functions for tower::ServiceBuilder.
pub trait ServiceBuilderExt<L> {
    /// Add a per-key admission layer keyed by `extractor`.
    fn admit_by<K>(
        self,
        limiter: Arc<dyn Strategy + Send + Sync + 'static>,
        extractor: K,
    ) -> ServiceBuilder<Stack<AdmissionLayer<dyn Strategy + Send + Sync + 'static, K>, L>>;
}

impl<L> ServiceBuilderExt<L> for ServiceBuilder<L> {
    fn admit_by<K>(
        self,
        limiter: Arc<dyn Strategy + Send + Sync + 'static>,
        extractor: K,
    ) -> ServiceBuilder<Stack<AdmissionLayer<dyn Strategy + Send + Sync + 'static, K>, L>> {
        self.layer(AdmissionLayer::new(limiter, extractor))
    }
}
