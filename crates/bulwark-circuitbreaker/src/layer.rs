use crate::breaker::CircuitBreaker;
use crate::classifier::{DefaultClassifier, FailureClassifier, FnClassifier};
use crate::error::CircuitBreakerError;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// A Tower [`Layer`] that routes every request through a [`CircuitBreaker`].
///
/// Services produced by the same layer share the breaker's state.
///
/// ```rust
/// use bulwark_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerLayer};
/// use tower::ServiceBuilder;
///
/// let breaker = CircuitBreaker::new(CircuitBreakerConfig::builder().name("n8n").build());
///
/// let service = ServiceBuilder::new()
///     .layer(CircuitBreakerLayer::new(breaker).failure_classifier(|e: &std::io::Error| {
///         e.kind() != std::io::ErrorKind::InvalidInput
///     }))
///     .service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) });
/// ```
#[derive(Clone, Debug)]
pub struct CircuitBreakerLayer<C = DefaultClassifier> {
    breaker: CircuitBreaker,
    classifier: Arc<C>,
}

impl CircuitBreakerLayer<DefaultClassifier> {
    /// Creates a layer that counts every inner error as a failure.
    pub fn new(breaker: CircuitBreaker) -> Self {
        Self {
            breaker,
            classifier: Arc::new(DefaultClassifier),
        }
    }
}

impl<C> CircuitBreakerLayer<C> {
    /// Replaces the failure classifier with a closure.
    pub fn failure_classifier<F>(self, f: F) -> CircuitBreakerLayer<FnClassifier<F>> {
        CircuitBreakerLayer {
            breaker: self.breaker,
            classifier: Arc::new(FnClassifier::new(f)),
        }
    }
}

impl<S, C> Layer<S> for CircuitBreakerLayer<C> {
    type Service = CircuitBreakerService<S, C>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreakerService {
            inner: service,
            breaker: self.breaker.clone(),
            classifier: Arc::clone(&self.classifier),
        }
    }
}

/// Service produced by [`CircuitBreakerLayer`].
#[derive(Debug)]
pub struct CircuitBreakerService<S, C = DefaultClassifier> {
    inner: S,
    breaker: CircuitBreaker,
    classifier: Arc<C>,
}

impl<S: Clone, C> Clone for CircuitBreakerService<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            breaker: self.breaker.clone(),
            classifier: Arc::clone(&self.classifier),
        }
    }
}

impl<S, C> CircuitBreakerService<S, C> {
    /// The breaker guarding this service.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

impl<S, C, Req> Service<Req> for CircuitBreakerService<S, C>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    C: FailureClassifier<S::Error> + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = CircuitBreakerError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(CircuitBreakerError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let breaker = self.breaker.clone();
        let classifier = Arc::clone(&self.classifier);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            breaker
                .execute_classified(classifier.as_ref(), move || inner.call(req))
                .await
        })
    }
}
