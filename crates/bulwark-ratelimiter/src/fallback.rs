//! Process-local admission used while the shared store is unavailable.
//!
//! Unlike the store, the local limiter counts in fixed windows: one counter
//! and one reset time per identifier.

use crate::config::RateLimitConfig;
use crate::result::RateLimitResult;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What a [`RateLimiter`](crate::RateLimiter) does when it cannot reach its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FallbackMode {
    /// Enforce the limit per process with a fixed window counter.
    #[default]
    LocalWindow,
    /// Admit every request.
    FailOpen,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: u64,
}

/// Fixed window counters keyed by identifier.
#[derive(Debug, Default)]
pub struct LocalWindow {
    windows: Mutex<HashMap<String, Window>>,
}

impl LocalWindow {
    /// Creates an empty set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Window>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts one request for `key` at `now`.
    pub fn check(&self, key: &str, config: &RateLimitConfig, now: u64) -> RateLimitResult {
        let mut windows = self.lock();
        let ends_at = now.saturating_add(config.window_millis());
        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            reset_at: ends_at,
        });

        if now >= window.reset_at {
            window.count = 0;
            window.reset_at = ends_at;
        }

        if window.count >= config.limit {
            return RateLimitResult::denied(config.limit, window.reset_at, now);
        }

        window.count += 1;
        RateLimitResult::allowed(config.limit, config.limit - window.count, window.reset_at)
    }

    /// Forgets the counter for `key`.
    pub fn reset(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Drops every window that has ended, returning how many were removed.
    pub fn sweep(&self, now: u64) -> usize {
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, window| window.reset_at > now);
        before - windows.len()
    }

    /// Number of identifiers currently tracked.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no identifier is tracked.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
