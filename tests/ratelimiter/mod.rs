//! Tests for the distributed rate limiter.
//!
//! Test organization:
//! - distributed.rs: several limiter instances sharing one store
//! - fallback.rs: behavior while the store is unreachable
//! - layer.rs: Tower integration

mod distributed;
mod fallback;
mod layer;

use bulwark_core::ManualClock;
use bulwark_ratelimiter::{RateLimitStore, RateLimiter, RateLimiterBuilder};
use std::sync::Arc;

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub(crate) fn builder(clock: &ManualClock) -> RateLimiterBuilder {
    init_tracing();
    RateLimiter::builder().clock(Arc::new(clock.clone()))
}

pub(crate) fn instance(store: Arc<dyn RateLimitStore>, clock: &ManualClock) -> RateLimiter {
    builder(clock).shared_store(store).build()
}
