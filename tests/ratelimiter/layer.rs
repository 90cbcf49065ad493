use bulwark_core::ManualClock;
use bulwark_ratelimiter::{InMemoryStore, RateLimitConfig, RateLimitError, RateLimitLayer};
use std::convert::Infallible;
use std::time::Duration;
use tower::{Layer, ServiceExt};

struct Request {
    client: &'static str,
}

#[tokio::test]
async fn each_client_gets_its_own_budget() {
    let clock = ManualClock::default();
    let limiter = super::builder(&clock).store(InMemoryStore::new()).build();
    let layer = RateLimitLayer::new(
        limiter,
        RateLimitConfig::new(2, Duration::from_secs(60)),
        |req: &Request| req.client.to_string(),
    );
    let service = layer.layer(tower::service_fn(|req: Request| async move {
        Ok::<_, Infallible>(req.client)
    }));

    for _ in 0..2 {
        let reply = service.clone().oneshot(Request { client: "alice" }).await;
        assert_eq!(reply.unwrap(), "alice");
    }

    let limited = service.clone().oneshot(Request { client: "alice" }).await;
    match limited {
        Err(RateLimitError::Limited { retry_after }) => {
            assert_eq!(retry_after, Some(Duration::from_secs(60)));
        }
        other => panic!("expected rate limit rejection, got {:?}", other.map(|_| ())),
    }

    let other = service.oneshot(Request { client: "bob" }).await;
    assert_eq!(other.unwrap(), "bob");
}
