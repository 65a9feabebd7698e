use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use pin_project_lite::pin_project;
use tower::BoxError;
use tower::Service;
use tracing::debug;
use tracing::trace;

use turnstile::Reason;
use turnstile::Strategy;

use crate::error::AdmitError;
use crate::key::KeyExtractor;

#[derive(Clone, Debug)]
struct AdmissionMetrics {
    decisions: Counter<u64>,
}

impl AdmissionMetrics {
    fn new() -> Self {
        let meter = global::meter("turnstile");
        Self {
            decisions: meter
                .u64_counter("turnstile.admission.decisions")
                .with_description("Admission decisions taken by the middleware")
                .build(),
        }
    }

    fn record(&self, outcome: &'static str) {
        self.decisions.add(1, &[KeyValue::new("outcome", outcome)]);
    }
}

/// Gates each request on the admission decision for its key.
///
/// Readiness is delegated to the inner service. The decision happens in `call`,
/// once the key is known: a rejected request resolves immediately to
/// [`AdmitError::RateLimited`] and never reaches the inner service.
#[derive(Debug)]
pub struct AdmissionService<L, K, S>
where
    L: ?Sized,
{
    inner: S,
    limiter: Arc<L>,
    extractor: K,
    instruments: AdmissionMetrics,
}

pin_project! {
    /// Either the inner service's future or an immediate rejection.
    #[project = ResponseFutureProj]
    pub enum ResponseFuture<F> {
        Admitted {
            #[pin]
            inner: F,
        },
        Rejected {
            error: Option<AdmitError>,
        },
    }
}

impl<F, T, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<T, E>>,
    E: From<BoxError>,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            ResponseFutureProj::Admitted { inner } => inner.poll(cx),
            ResponseFutureProj::Rejected { error } => {
                let error: BoxError = Box::new(
                    error
                        .take()
                        .expect("ResponseFuture polled after completion"),
                );
                Poll::Ready(Err(E::from(error)))
            }
        }
    }
}

impl<L, K, S> Clone for AdmissionService<L, K, S>
where
    L: ?Sized,
    K: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: Arc::clone(&self.limiter),
            extractor: self.extractor.clone(),
            instruments: self.instruments.clone(),
        }
    }
}

impl<L, K, S, Req> Service<Req> for AdmissionService<L, K, S>
where
    L: Strategy + ?Sized,
    K: KeyExtractor<Req>,
    S: Service<Req, Error = BoxError>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let key = self.extractor.extract(&req);

        match self.limiter.process(&key) {
            ControlFlow::Continue(()) => {
                trace!(key = %key, "Request admitted");
                self.instruments.record("admitted");
                ResponseFuture::Admitted {
                    inner: self.inner.call(req),
                }
            }
            ControlFlow::Break(Reason::Overloaded { retry_after }) => {
                debug!(key = %key, ?retry_after, "Request rejected: rate limit exceeded");
                self.instruments.record("rejected");
                ResponseFuture::Rejected {
                    error: Some(AdmitError::RateLimited { key, retry_after }),
                }
            }
        }
    }
}

impl<L, K, S> AdmissionService<L, K, S>
where
    L: ?Sized,
{
    pub fn new(inner: S, limiter: Arc<L>, extractor: K) -> Self {
        Self {
            inner,
            limiter,
            extractor,
            instruments: AdmissionMetrics::new(),
        }
    }

    /// The strategy this service consults.
    pub fn limiter(&self) -> &Arc<L> {
        &self.limiter
    }
}
