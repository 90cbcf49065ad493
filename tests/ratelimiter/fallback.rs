use super::builder;
use bulwark_core::ManualClock;
use bulwark_ratelimiter::{
    FallbackMode, InMemoryStore, RateLimitConfig, RateLimitInfo, RateLimitResult, RateLimitStore,
    StoreError,
};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A store that can be switched off, as if the network to it went away.
#[derive(Clone, Default)]
struct SwitchableStore {
    inner: InMemoryStore,
    down: Arc<AtomicBool>,
}

impl SwitchableStore {
    fn available(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

impl RateLimitStore for SwitchableStore {
    fn check<'a>(
        &'a self,
        key: &'a str,
        config: &'a RateLimitConfig,
        now: u64,
    ) -> BoxFuture<'a, Result<RateLimitResult, StoreError>> {
        Box::pin(async move {
            self.available()?;
            self.inner.check(key, config, now).await
        })
    }

    fn reset<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.available()?;
            self.inner.reset(key).await
        })
    }

    fn block<'a>(&'a self, key: &'a str, until: u64, now: u64) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.available()?;
            self.inner.block(key, until, now).await
        })
    }

    fn unblock<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.available()?;
            self.inner.unblock(key).await
        })
    }

    fn info<'a>(
        &'a self,
        key: &'a str,
        window: Duration,
        now: u64,
    ) -> BoxFuture<'a, Result<RateLimitInfo, StoreError>> {
        Box::pin(async move {
            self.available()?;
            self.inner.info(key, window, now).await
        })
    }
}

#[tokio::test]
async fn outage_switches_to_local_windows_and_back() {
    let clock = ManualClock::default();
    let store = SwitchableStore::default();
    let fallbacks = Arc::new(AtomicUsize::new(0));
    let recoveries = Arc::new(AtomicUsize::new(0));
    let (f, r) = (Arc::clone(&fallbacks), Arc::clone(&recoveries));
    let limiter = builder(&clock)
        .name("api")
        .store(store.clone())
        .on_fallback(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        })
        .on_recovered(move || {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    let config = RateLimitConfig::new(3, Duration::from_secs(60));

    store.down.store(true, Ordering::SeqCst);
    for _ in 0..3 {
        assert!(limiter.check("user", &config).await.allowed);
    }
    assert!(!limiter.check("user", &config).await.allowed);
    assert!(limiter.is_degraded());
    // Every failed call falls back, but only the first one is reported.
    assert_eq!(fallbacks.load(Ordering::SeqCst), 1);

    assert_eq!(
        limiter.info("user", &config).await,
        Err(StoreError::Unavailable("connection refused".to_string()))
    );

    store.down.store(false, Ordering::SeqCst);
    let result = limiter.check("user", &config).await;
    assert!(result.allowed);
    assert_eq!(result.remaining, 2);
    assert!(!limiter.is_degraded());
    assert_eq!(recoveries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fail_open_admits_during_outage() {
    let clock = ManualClock::default();
    let store = SwitchableStore::default();
    store.down.store(true, Ordering::SeqCst);
    let limiter = builder(&clock)
        .store(store)
        .fallback(FallbackMode::FailOpen)
        .build();
    let config = RateLimitConfig::new(1, Duration::from_secs(60));

    for _ in 0..10 {
        let result = limiter.check("user", &config).await;
        assert!(result.allowed);
        assert_eq!(result.remaining, 1);
    }
}

/// Local windows are fixed: the count starts over once the window has ended.
#[tokio::test]
async fn local_windows_reset_and_are_swept() {
    let clock = ManualClock::default();
    let limiter = builder(&clock).build();
    let config = RateLimitConfig::new(2, Duration::from_secs(10));

    assert!(limiter.check("a", &config).await.allowed);
    assert!(limiter.check("b", &config).await.allowed);
    assert!(limiter.check("a", &config).await.allowed);
    assert!(!limiter.check("a", &config).await.allowed);

    clock.advance(Duration::from_secs(10));
    assert_eq!(limiter.sweep_local(), 2);

    assert!(limiter.check("a", &config).await.allowed);
    assert_eq!(limiter.block("a", Duration::from_secs(1)).await, Err(StoreError::Unconfigured));
    assert_eq!(limiter.reset("a").await, Ok(()));
}
