use super::instance;
use bulwark_core::ManualClock;
use bulwark_ratelimiter::{InMemoryStore, RateLimitConfig, RateLimitStore};
use std::sync::Arc;
use std::time::Duration;

/// Two processes talking to the same store admit five requests in total.
#[tokio::test]
async fn limit_holds_across_instances() {
    let clock = ManualClock::default();
    let store: Arc<dyn RateLimitStore> = Arc::new(InMemoryStore::new());
    let first = instance(Arc::clone(&store), &clock);
    let second = instance(store, &clock);
    let config = RateLimitConfig::new(5, Duration::from_secs(60));

    let mut remaining = Vec::new();
    for i in 0..5 {
        let limiter = if i % 2 == 0 { &first } else { &second };
        let result = limiter.check("203.0.113.9", &config).await;
        assert!(result.allowed);
        remaining.push(result.remaining);
    }
    assert_eq!(remaining, vec![4, 3, 2, 1, 0]);

    let denied = second.check("203.0.113.9", &config).await;
    assert!(!denied.allowed);
    assert_eq!(denied.remaining, 0);
    assert_eq!(denied.retry_after, Some(Duration::from_secs(60)));

    assert!(first.check("198.51.100.1", &config).await.allowed);
}

/// Slots come back one at a time as the oldest requests leave the window.
#[tokio::test]
async fn window_slides() {
    let clock = ManualClock::default();
    let limiter = instance(Arc::new(InMemoryStore::new()), &clock);
    let config = RateLimitConfig::new(3, Duration::from_secs(10));

    for _ in 0..3 {
        assert!(limiter.check("user-1", &config).await.allowed);
        clock.advance(Duration::from_secs(4));
    }
    // Requests at 0s, 4s and 8s; now 12s, so the first has left the window.
    assert!(limiter.check("user-1", &config).await.allowed);
    assert!(!limiter.check("user-1", &config).await.allowed);

    clock.advance(Duration::from_secs(2));
    let result = limiter.check("user-1", &config).await;
    assert!(result.allowed);
    assert_eq!(result.remaining, 0);
}

#[tokio::test]
async fn auth_preset_blocks_after_limit() {
    let clock = ManualClock::default();
    let limiter = instance(Arc::new(InMemoryStore::new()), &clock);
    let config = RateLimitConfig::AUTH;

    for _ in 0..5 {
        assert!(limiter.check("login:maria", &config).await.allowed);
    }
    let denied = limiter.check("login:maria", &config).await;
    assert_eq!(denied.retry_after, Some(Duration::from_secs(900)));

    clock.advance(Duration::from_secs(600));
    let still = limiter.check("login:maria", &config).await;
    assert!(!still.allowed);
    assert_eq!(still.retry_after, Some(Duration::from_secs(300)));

    let info = limiter.info("login:maria", &config).await.unwrap();
    assert!(info.blocked);

    clock.advance(Duration::from_secs(300));
    assert!(limiter.check("login:maria", &config).await.allowed);
}

#[tokio::test]
async fn administration() {
    let clock = ManualClock::default();
    let limiter = instance(Arc::new(InMemoryStore::new()), &clock);
    let config = RateLimitConfig::new(10, Duration::from_secs(60));

    for _ in 0..4 {
        limiter.check("tenant-7", &config).await;
    }
    let info = limiter.info("tenant-7", &config).await.unwrap();
    assert_eq!(info.count, 4);
    assert!(!info.blocked);

    // Reading does not count.
    let info = limiter.info("tenant-7", &config).await.unwrap();
    assert_eq!(info.count, 4);

    limiter.block("tenant-7", Duration::from_secs(30)).await.unwrap();
    let denied = limiter.check("tenant-7", &config).await;
    assert!(!denied.allowed);
    assert_eq!(denied.retry_after, Some(Duration::from_secs(30)));

    limiter.unblock("tenant-7").await.unwrap();
    assert!(limiter.check("tenant-7", &config).await.allowed);

    limiter.reset("tenant-7").await.unwrap();
    assert_eq!(limiter.info("tenant-7", &config).await.unwrap().count, 0);
}

/// A block meant to last forever outlives any realistic clock.
#[tokio::test]
async fn permanent_block() {
    let clock = ManualClock::default();
    let limiter = instance(Arc::new(InMemoryStore::new()), &clock);
    let config = RateLimitConfig::STANDARD;

    limiter.block("abuser", Duration::MAX).await.unwrap();
    clock.advance(Duration::from_secs(10 * 365 * 24 * 3600));

    assert!(!limiter.check("abuser", &config).await.allowed);
    assert!(limiter.check("neighbour", &config).await.allowed);
}

/// Identifiers that stop sending requests do not stay in the shared store.
#[tokio::test]
async fn idle_identifiers_are_forgotten() {
    let clock = ManualClock::default();
    let store = InMemoryStore::new();
    let first = instance(Arc::new(store.clone()), &clock);
    let second = instance(Arc::new(store.clone()), &clock);
    let config = RateLimitConfig::new(5, Duration::from_secs(60));

    for i in 0..10_000 {
        let limiter = if i % 2 == 0 { &first } else { &second };
        limiter.check(&format!("ip:{i}"), &config).await;
    }
    assert_eq!(store.len(), 10_000);

    clock.advance(Duration::from_secs(24 * 3600));
    let info = first.info("ip:0", &config).await.unwrap();
    assert_eq!(info.count, 0);
    assert!(store.is_empty());
    assert_eq!(second.sweep(), 0);
}

#[tokio::test]
async fn response_headers() {
    let clock = ManualClock::new(1_000_000);
    let limiter = instance(Arc::new(InMemoryStore::new()), &clock);
    let config = RateLimitConfig::new(1, Duration::from_secs(60));

    let allowed = limiter.check("k", &config).await;
    assert_eq!(
        allowed.headers(),
        vec![
            ("X-RateLimit-Limit", "1".to_string()),
            ("X-RateLimit-Remaining", "0".to_string()),
            ("X-RateLimit-Reset", "1060".to_string()),
        ]
    );

    clock.advance(Duration::from_millis(1_500));
    let denied = limiter.check("k", &config).await;
    let headers = denied.headers();
    assert!(headers.contains(&("Retry-After", "59".to_string())));
}

#[test]
fn presets_by_name() {
    assert_eq!(RateLimitConfig::named("strict"), Some(RateLimitConfig::STRICT));
    assert_eq!(RateLimitConfig::named("API-KEY"), Some(RateLimitConfig::API_KEY));
    assert_eq!(RateLimitConfig::named("unlimited"), None);
    assert_eq!(RateLimitConfig::STRICT.block_duration, Some(Duration::from_secs(300)));
}
