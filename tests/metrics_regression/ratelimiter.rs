//! Rate limiter metrics regression tests

use super::helpers::*;
use bulwark_ratelimiter::{
    RateLimitConfig, RateLimitInfo, RateLimitResult, RateLimitStore, RateLimiter, StoreError,
};
use futures::future::BoxFuture;
use serial_test::serial;
use std::time::Duration;

struct UnreachableStore;

impl UnreachableStore {
    fn error() -> StoreError {
        StoreError::Unavailable("connection refused".to_string())
    }
}

impl RateLimitStore for UnreachableStore {
    fn check<'a>(
        &'a self,
        _key: &'a str,
        _config: &'a RateLimitConfig,
        _now: u64,
    ) -> BoxFuture<'a, Result<RateLimitResult, StoreError>> {
        Box::pin(async { Err(Self::error()) })
    }

    fn reset<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async { Err(Self::error()) })
    }

    fn block<'a>(
        &'a self,
        _key: &'a str,
        _until: u64,
        _now: u64,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async { Err(Self::error()) })
    }

    fn unblock<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async { Err(Self::error()) })
    }

    fn info<'a>(
        &'a self,
        _key: &'a str,
        _window: Duration,
        _now: u64,
    ) -> BoxFuture<'a, Result<RateLimitInfo, StoreError>> {
        Box::pin(async { Err(Self::error()) })
    }
}

#[tokio::test]
#[serial]
async fn ratelimiter_check_metrics() {
    init_recorder();

    let limiter = RateLimiter::builder()
        .name("metrics-ratelimiter")
        .store(bulwark_ratelimiter::InMemoryStore::new())
        .build();
    let config = RateLimitConfig::new(1, Duration::from_secs(60));

    assert!(limiter.check("client", &config).await.allowed);
    assert!(!limiter.check("client", &config).await.allowed);

    assert_counter_exists("ratelimiter_checks_total");
    assert_metric_has_label("ratelimiter_checks_total", "ratelimiter", "metrics-ratelimiter");
    assert_metric_has_label("ratelimiter_checks_total", "outcome", "allowed");
    assert_metric_has_label("ratelimiter_checks_total", "outcome", "denied");
    assert_metric_has_label("ratelimiter_checks_total", "source", "store");
}

#[tokio::test]
#[serial]
async fn ratelimiter_fallback_metrics() {
    init_recorder();

    let limiter = RateLimiter::builder()
        .name("metrics-ratelimiter-fallback")
        .store(UnreachableStore)
        .build();

    assert!(limiter.check("client", &RateLimitConfig::STANDARD).await.allowed);

    assert_counter_exists("ratelimiter_fallback_total");
    assert_metric_has_label(
        "ratelimiter_fallback_total",
        "ratelimiter",
        "metrics-ratelimiter-fallback",
    );
    assert_metric_has_label("ratelimiter_checks_total", "source", "local");
}
