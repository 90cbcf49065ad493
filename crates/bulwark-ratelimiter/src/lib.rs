//! Sliding window rate limiting shared across processes.
//!
//! A [`RateLimiter`] admits at most `limit` requests per identifier in any
//! trailing `window`. Windows live in a [`RateLimitStore`]; every check runs as
//! one atomic step against it, so limiter instances in different processes
//! that share a store enforce a single limit together.
//!
//! - [`InMemoryStore`]: one process, any number of limiter instances
//! - [`RedisStore`] (feature `redis`): many processes, one Lua script per check
//!
//! If the store is missing or fails, [`RateLimiter::check`] does not return an
//! error. It decides locally with a fixed window counter per identifier, or
//! admits everything with [`FallbackMode::FailOpen`], and logs a warning once
//! per outage.
//!
//! ```rust
//! use bulwark_ratelimiter::{InMemoryStore, RateLimitConfig, RateLimiter};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let limiter = RateLimiter::builder()
//!     .name("auth")
//!     .prefix("login")
//!     .store(InMemoryStore::new())
//!     .build();
//!
//! let config = RateLimitConfig::named("auth").unwrap_or(RateLimitConfig::AUTH);
//! let result = limiter.check("203.0.113.7", &config).await;
//! println!("allowed={} remaining={}", result.allowed, result.remaining);
//!
//! limiter.block("203.0.113.7", Duration::from_secs(3600)).await.ok();
//! # }
//! ```
//!
//! # Feature Flags
//! - `redis`: [`RedisStore`]
//! - `metrics`: `ratelimiter_checks_total` and `ratelimiter_fallback_total` counters
//! - `serde`: (de)serialize [`RateLimitConfig`] and [`FallbackMode`]

pub mod config;
pub mod error;
pub mod events;
pub mod fallback;
pub mod layer;
pub mod limiter;
pub mod result;
pub mod store;

pub use config::RateLimitConfig;
pub use error::{RateLimitError, StoreError};
pub use events::RateLimiterEvent;
pub use fallback::{FallbackMode, LocalWindow};
pub use layer::{RateLimitLayer, RateLimitService};
pub use limiter::{RateLimiter, RateLimiterBuilder};
pub use result::{RateLimitInfo, RateLimitResult};
#[cfg(feature = "redis")]
pub use store::RedisStore;
pub use store::{InMemoryStore, RateLimitStore};
