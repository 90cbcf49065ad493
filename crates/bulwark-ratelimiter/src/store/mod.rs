//! Shared stores holding the sliding window logs.
//!
//! A store must run the whole admission decision of [`RateLimitStore::check`]
//! atomically: block lookup, pruning, counting and insertion may not be
//! interleaved with another check for the same key, no matter which process
//! issued it.

use crate::config::RateLimitConfig;
use crate::error::StoreError;
use crate::result::{RateLimitInfo, RateLimitResult};
use futures::future::BoxFuture;
use std::time::Duration;

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::InMemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

/// Storage backend for sliding window logs.
///
/// All timestamps are milliseconds since the Unix epoch, taken by the caller
/// so that every instance sharing a store agrees on the same clock source.
pub trait RateLimitStore: Send + Sync {
    /// Atomically decides whether `key` may make one more request at `now`.
    fn check<'a>(
        &'a self,
        key: &'a str,
        config: &'a RateLimitConfig,
        now: u64,
    ) -> BoxFuture<'a, Result<RateLimitResult, StoreError>>;

    /// Drops the log and any block for `key`.
    fn reset<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Blocks `key` until `until`, regardless of its log.
    fn block<'a>(&'a self, key: &'a str, until: u64, now: u64)
        -> BoxFuture<'a, Result<(), StoreError>>;

    /// Lifts a block on `key`, leaving its log untouched.
    fn unblock<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Reads the state of `key` without recording a request.
    fn info<'a>(
        &'a self,
        key: &'a str,
        window: Duration,
        now: u64,
    ) -> BoxFuture<'a, Result<RateLimitInfo, StoreError>>;

    /// Drops state that expired at or before `now`, returning how many keys
    /// were removed.
    ///
    /// Stores whose backend expires keys on its own keep the default, which
    /// does nothing.
    fn sweep(&self, _now: u64) -> usize {
        0
    }
}
