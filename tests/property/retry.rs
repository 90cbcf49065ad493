//! Property tests for the retry backoff.
//!
//! Invariants tested:
//! - Delays never shrink from one retry to the next
//! - No delay exceeds the cap, and jitter adds at most half the base

use bulwark_retry::ExponentialBackoff;
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    #[test]
    fn backoff_is_monotone_and_capped(
        initial_ms in 1u64..=2_000,
        multiplier in 1.0f64..=4.0,
        max_ms in 1u64..=60_000,
    ) {
        let max = Duration::from_millis(max_ms);
        let backoff = ExponentialBackoff::new(Duration::from_millis(initial_ms))
            .multiplier(multiplier)
            .max_delay(max)
            .jitter(false);

        let mut previous = Duration::ZERO;
        for retry in 1..=40 {
            let delay = backoff.delay(retry);
            prop_assert!(delay >= previous);
            prop_assert!(delay <= max);
            previous = delay;
        }
    }

    #[test]
    fn jitter_is_bounded(initial_ms in 1u64..=1_000, retry in 1u32..=10) {
        let backoff = ExponentialBackoff::new(Duration::from_millis(initial_ms));
        let base = backoff.base_delay(retry);
        let delay = backoff.delay(retry);
        prop_assert!(delay >= base);
        prop_assert!(delay <= base + base / 2 + Duration::from_micros(1));
    }
}
