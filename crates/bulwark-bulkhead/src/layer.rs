//! Tower integration for the bulkhead.

use crate::bulkhead::Bulkhead;
use crate::error::BulkheadError;
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Layer that runs every request of the wrapped service inside a [`Bulkhead`].
///
/// All services produced by one layer share the same bulkhead, so the
/// concurrency cap applies across every clone.
///
/// ```rust
/// use bulwark_bulkhead::{Bulkhead, BulkheadConfig, BulkheadLayer};
/// use tower::ServiceBuilder;
///
/// # async fn example() {
/// let bulkhead = Bulkhead::new(BulkheadConfig::builder().name("webhook").build());
///
/// let service = ServiceBuilder::new()
///     .layer(BulkheadLayer::new(bulkhead))
///     .service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) });
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct BulkheadLayer {
    bulkhead: Bulkhead,
}

impl BulkheadLayer {
    /// Creates a layer around an existing bulkhead handle.
    pub fn new(bulkhead: Bulkhead) -> Self {
        Self { bulkhead }
    }
}

impl<S> Layer<S> for BulkheadLayer {
    type Service = BulkheadService<S>;

    fn layer(&self, service: S) -> Self::Service {
        BulkheadService {
            inner: service,
            bulkhead: self.bulkhead.clone(),
        }
    }
}

/// Service produced by [`BulkheadLayer`].
#[derive(Clone, Debug)]
pub struct BulkheadService<S> {
    inner: S,
    bulkhead: Bulkhead,
}

impl<S> BulkheadService<S> {
    /// The bulkhead guarding this service.
    pub fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }
}

impl<S, Request> Service<Request> for BulkheadService<S>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    Request: Send + 'static,
{
    type Response = S::Response;
    type Error = BulkheadError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(BulkheadError::Inner)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let bulkhead = self.bulkhead.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move { bulkhead.execute(move || inner.call(request)).await })
    }
}
