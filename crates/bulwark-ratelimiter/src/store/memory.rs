use super::RateLimitStore;
use crate::config::{millis, RateLimitConfig};
use crate::error::StoreError;
use crate::result::{RateLimitInfo, RateLimitResult};
use futures::future::BoxFuture;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Minimum time between two sweeps triggered by traffic.
const SWEEP_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Default)]
struct Entry {
    log: VecDeque<u64>,
    /// One window after the latest admission.
    expires_at: u64,
    blocked_until: Option<u64>,
}

impl Entry {
    fn prune(&mut self, now: u64, window: u64) {
        let cutoff = now.saturating_sub(window);
        while self.log.front().is_some_and(|&ts| ts <= cutoff) {
            self.log.pop_front();
        }
    }

    fn active_block(&self, now: u64) -> Option<u64> {
        self.blocked_until.filter(|&until| until > now)
    }

    fn is_expired(&self, now: u64) -> bool {
        self.expires_at <= now && self.active_block(now).is_none()
    }
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    next_sweep: u64,
}

impl State {
    fn sweep(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        self.next_sweep = now.saturating_add(SWEEP_INTERVAL_MS);
        before - self.entries.len()
    }

    fn maybe_sweep(&mut self, now: u64) {
        if now >= self.next_sweep {
            self.sweep(now);
        }
    }
}

/// Process-local store.
///
/// Clones share the same windows, so several [`RateLimiter`](crate::RateLimiter)
/// instances built on clones of one store behave like instances sharing a
/// remote store. Every operation runs under one mutex.
///
/// A key expires one window after its latest admission, or when its block
/// ends if that is later. Expired keys are dropped by [`InMemoryStore::sweep`],
/// which checks and reads also run at most once a minute.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` if no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Drops every key that expired at or before `now`, returning how many
    /// were removed.
    pub fn sweep(&self, now: u64) -> usize {
        self.lock().sweep(now)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_now(&self, key: &str, config: &RateLimitConfig, now: u64) -> RateLimitResult {
        let window = config.window_millis();
        let mut state = self.lock();
        state.maybe_sweep(now);
        let entry = state.entries.entry(key.to_string()).or_default();

        if let Some(until) = entry.active_block(now) {
            return RateLimitResult::denied(config.limit, until, now);
        }
        entry.blocked_until = None;
        entry.prune(now, window);

        let count = entry.log.len() as u32;
        if count >= config.limit {
            let block = config.block_millis();
            let reset_at = if block > 0 {
                let until = now.saturating_add(block);
                entry.blocked_until = Some(until);
                until
            } else {
                let oldest = entry.log.front().copied().unwrap_or(now);
                oldest.saturating_add(window)
            };
            return RateLimitResult::denied(config.limit, reset_at, now);
        }

        entry.log.push_back(now);
        entry.expires_at = now.saturating_add(window);
        let oldest = entry.log.front().copied().unwrap_or(now);
        RateLimitResult::allowed(
            config.limit,
            config.limit - count - 1,
            oldest.saturating_add(window),
        )
    }
}

impl RateLimitStore for InMemoryStore {
    fn check<'a>(
        &'a self,
        key: &'a str,
        config: &'a RateLimitConfig,
        now: u64,
    ) -> BoxFuture<'a, Result<RateLimitResult, StoreError>> {
        let result = self.check_now(key, config, now);
        Box::pin(async move { Ok(result) })
    }

    fn reset<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        self.lock().entries.remove(key);
        Box::pin(async { Ok(()) })
    }

    fn block<'a>(
        &'a self,
        key: &'a str,
        until: u64,
        _now: u64,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        self.lock()
            .entries
            .entry(key.to_string())
            .or_default()
            .blocked_until = Some(until);
        Box::pin(async { Ok(()) })
    }

    fn unblock<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        if let Some(entry) = self.lock().entries.get_mut(key) {
            entry.blocked_until = None;
        }
        Box::pin(async { Ok(()) })
    }

    fn info<'a>(
        &'a self,
        key: &'a str,
        window: Duration,
        now: u64,
    ) -> BoxFuture<'a, Result<RateLimitInfo, StoreError>> {
        let mut state = self.lock();
        state.maybe_sweep(now);
        let info = match state.entries.get(key) {
            Some(entry) => {
                let cutoff = now.saturating_sub(millis(window));
                let blocked_until = entry.active_block(now);
                RateLimitInfo {
                    count: entry.log.iter().filter(|&&ts| ts > cutoff).count() as u32,
                    blocked: blocked_until.is_some(),
                    blocked_until,
                }
            }
            None => RateLimitInfo::default(),
        };
        drop(state);
        Box::pin(async move { Ok(info) })
    }

    fn sweep(&self, now: u64) -> usize {
        InMemoryStore::sweep(self, now)
    }
}
