//! Tower integration for the rate limiter.

use crate::config::RateLimitConfig;
use crate::error::RateLimitError;
use crate::limiter::RateLimiter;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Layer that checks every request against a [`RateLimiter`] before calling
/// the wrapped service.
///
/// The identifier is taken from the request by a key extractor, typically the
/// client address, user id or API key.
///
/// ```rust
/// use bulwark_ratelimiter::{RateLimitConfig, RateLimitLayer, RateLimiter};
/// use tower::ServiceBuilder;
///
/// struct Request {
///     api_key: String,
/// }
///
/// # async fn example() {
/// let limiter = RateLimiter::builder().name("api").build();
///
/// let service = ServiceBuilder::new()
///     .layer(RateLimitLayer::new(limiter, RateLimitConfig::API_KEY, |req: &Request| {
///         req.api_key.clone()
///     }))
///     .service_fn(|_req: Request| async { Ok::<_, std::io::Error>("ok") });
/// # }
/// ```
pub struct RateLimitLayer<K> {
    limiter: RateLimiter,
    config: RateLimitConfig,
    key_fn: Arc<K>,
}

impl<K> RateLimitLayer<K> {
    /// Creates a layer applying `config` per key returned by `key_fn`.
    pub fn new(limiter: RateLimiter, config: RateLimitConfig, key_fn: K) -> Self {
        Self {
            limiter,
            config,
            key_fn: Arc::new(key_fn),
        }
    }
}

impl<K> Clone for RateLimitLayer<K> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            config: self.config,
            key_fn: Arc::clone(&self.key_fn),
        }
    }
}

impl<S, K> Layer<S> for RateLimitLayer<K> {
    type Service = RateLimitService<S, K>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService {
            inner: service,
            limiter: self.limiter.clone(),
            config: self.config,
            key_fn: Arc::clone(&self.key_fn),
        }
    }
}

/// Service produced by [`RateLimitLayer`].
pub struct RateLimitService<S, K> {
    inner: S,
    limiter: RateLimiter,
    config: RateLimitConfig,
    key_fn: Arc<K>,
}

impl<S: Clone, K> Clone for RateLimitService<S, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
            config: self.config,
            key_fn: Arc::clone(&self.key_fn),
        }
    }
}

impl<S, K, Request> Service<Request> for RateLimitService<S, K>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    K: Fn(&Request) -> String + Send + Sync + 'static,
    Request: Send + 'static,
{
    type Response = S::Response;
    type Error = RateLimitError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(RateLimitError::Inner)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let limiter = self.limiter.clone();
        let config = self.config;
        let key = (self.key_fn)(&request);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let result = limiter.check(&key, &config).await;
            if !result.allowed {
                return Err(RateLimitError::Limited {
                    retry_after: result.retry_after,
                });
            }
            inner.call(request).await.map_err(RateLimitError::Inner)
        })
    }
}
