//! Events emitted by the rate limiter.

use bulwark_core::events::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by [`RateLimiter`](crate::RateLimiter).
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// A request was admitted.
    Allowed {
        pattern_name: String,
        timestamp: Instant,
        identifier: String,
        remaining: u32,
    },
    /// A request was refused.
    Denied {
        pattern_name: String,
        timestamp: Instant,
        identifier: String,
        retry_after: Option<Duration>,
    },
    /// The shared store failed and checks now run locally.
    FallbackActivated {
        pattern_name: String,
        timestamp: Instant,
        error: String,
    },
    /// The shared store answered again after a period of fallback.
    StoreRecovered {
        pattern_name: String,
        timestamp: Instant,
    },
}

impl ResilienceEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::Allowed { .. } => "allowed",
            RateLimiterEvent::Denied { .. } => "denied",
            RateLimiterEvent::FallbackActivated { .. } => "fallback_activated",
            RateLimiterEvent::StoreRecovered { .. } => "store_recovered",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::Allowed { timestamp, .. }
            | RateLimiterEvent::Denied { timestamp, .. }
            | RateLimiterEvent::FallbackActivated { timestamp, .. }
            | RateLimiterEvent::StoreRecovered { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RateLimiterEvent::Allowed { pattern_name, .. }
            | RateLimiterEvent::Denied { pattern_name, .. }
            | RateLimiterEvent::FallbackActivated { pattern_name, .. }
            | RateLimiterEvent::StoreRecovered { pattern_name, .. } => pattern_name,
        }
    }
}
