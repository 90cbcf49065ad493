//! Property tests for the rate limiter.
//!
//! Invariants tested:
//! - No trailing window ever holds more than `limit` admissions
//! - Remaining never exceeds the limit and reaches zero on the last admission

use bulwark_core::ManualClock;
use bulwark_ratelimiter::{InMemoryStore, RateLimitConfig, RateLimiter};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Builder;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn sliding_window_never_over_admits(
        limit in 1u32..=20,
        window_ms in 100u64..=5_000,
        gaps in prop::collection::vec(0u64..=400, 1..=150),
        instances in 1usize..=3,
    ) {
        let rt = Builder::new_current_thread().build().unwrap();

        rt.block_on(async {
            let clock = ManualClock::new(1_000_000);
            let store = InMemoryStore::new();
            let limiters: Vec<RateLimiter> = (0..instances)
                .map(|_| {
                    RateLimiter::builder()
                        .store(store.clone())
                        .clock(Arc::new(clock.clone()))
                        .build()
                })
                .collect();
            let config = RateLimitConfig::new(limit, Duration::from_millis(window_ms));

            let mut now = 1_000_000u64;
            let mut admitted: Vec<u64> = Vec::new();
            for (i, gap) in gaps.iter().enumerate() {
                now += gap;
                clock.set(now);

                let result = limiters[i % instances].check("id", &config).await;
                prop_assert!(result.remaining <= limit);
                if result.allowed {
                    admitted.push(now);
                    let in_window = admitted.iter().filter(|&&t| t + window_ms > now).count();
                    prop_assert!(in_window as u32 <= limit);
                } else {
                    prop_assert!(result.retry_after.is_some());
                }
            }
            Ok(())
        })?;
    }
}
