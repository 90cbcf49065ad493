use crate::config::{millis, RateLimitConfig};
use crate::error::StoreError;
use crate::events::RateLimiterEvent;
use crate::fallback::{FallbackMode, LocalWindow};
use crate::result::{RateLimitInfo, RateLimitResult};
use crate::store::RateLimitStore;
use bulwark_core::events::{EventListeners, FnListener};
use bulwark_core::{SharedClock, SystemClock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Admission control per identifier over a shared sliding window store.
///
/// `check` never fails: when no store is configured, or the store returns an
/// error, the decision is made locally according to the [`FallbackMode`].
/// The limiter switches back to the store as soon as it answers again.
///
/// ```rust
/// use bulwark_ratelimiter::{InMemoryStore, RateLimitConfig, RateLimiter};
///
/// # async fn example() {
/// let limiter = RateLimiter::builder()
///     .name("api")
///     .store(InMemoryStore::new())
///     .build();
///
/// let result = limiter.check("user-42", &RateLimitConfig::STANDARD).await;
/// if !result.allowed {
///     for (header, value) in result.headers() {
///         println!("{header}: {value}");
///     }
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct RateLimiter {
    shared: Arc<Shared>,
}

struct Shared {
    name: String,
    prefix: String,
    store: Option<Arc<dyn RateLimitStore>>,
    fallback_mode: FallbackMode,
    local: LocalWindow,
    clock: SharedClock,
    degraded: AtomicBool,
    event_listeners: EventListeners<RateLimiterEvent>,
}

impl RateLimiter {
    /// Creates a new builder.
    pub fn builder() -> RateLimiterBuilder {
        RateLimiterBuilder::new()
    }

    /// Limiter name used in events, logs and metric labels.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns `true` while checks are being decided locally because the
    /// store failed.
    pub fn is_degraded(&self) -> bool {
        self.shared.degraded.load(Ordering::Acquire)
    }

    fn key(&self, identifier: &str) -> String {
        format!("{}:{}", self.shared.prefix, identifier)
    }

    fn now(&self) -> u64 {
        self.shared.clock.now_millis()
    }

    /// Records one request for `identifier` and decides whether it may proceed.
    pub async fn check(&self, identifier: &str, config: &RateLimitConfig) -> RateLimitResult {
        let shared = &self.shared;
        let key = self.key(identifier);
        let now = self.now();

        let (result, source) = match &shared.store {
            Some(store) => match store.check(&key, config, now).await {
                Ok(result) => {
                    self.store_answered();
                    (result, "store")
                }
                Err(error) => {
                    self.store_failed(&error);
                    (self.check_locally(&key, config, now), "local")
                }
            },
            None => (self.check_locally(&key, config, now), "local"),
        };

        #[cfg(feature = "metrics")]
        {
            let outcome = if result.allowed { "allowed" } else { "denied" };
            counter!(
                "ratelimiter_checks_total",
                "ratelimiter" => shared.name.clone(),
                "outcome" => outcome,
                "source" => source
            )
            .increment(1);
        }
        #[cfg(not(feature = "metrics"))]
        let _ = source;

        if result.allowed {
            shared.event_listeners.emit(&RateLimiterEvent::Allowed {
                pattern_name: shared.name.clone(),
                timestamp: Instant::now(),
                identifier: identifier.to_string(),
                remaining: result.remaining,
            });
        } else {
            tracing::debug!(
                ratelimiter = %shared.name,
                identifier,
                retry_after = ?result.retry_after,
                "request rate limited"
            );
            shared.event_listeners.emit(&RateLimiterEvent::Denied {
                pattern_name: shared.name.clone(),
                timestamp: Instant::now(),
                identifier: identifier.to_string(),
                retry_after: result.retry_after,
            });
        }

        result
    }

    fn check_locally(&self, key: &str, config: &RateLimitConfig, now: u64) -> RateLimitResult {
        match self.shared.fallback_mode {
            FallbackMode::LocalWindow => self.shared.local.check(key, config, now),
            FallbackMode::FailOpen => {
                RateLimitResult::allowed(
                config.limit,
                config.limit,
                now.saturating_add(config.window_millis()),
            )
            }
        }
    }

    fn store_failed(&self, error: &StoreError) {
        let shared = &self.shared;

        #[cfg(feature = "metrics")]
        counter!("ratelimiter_fallback_total", "ratelimiter" => shared.name.clone()).increment(1);

        if shared.degraded.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::warn!(
            ratelimiter = %shared.name,
            %error,
            mode = ?shared.fallback_mode,
            "rate limit store unavailable, deciding locally"
        );
        shared.event_listeners.emit(&RateLimiterEvent::FallbackActivated {
            pattern_name: shared.name.clone(),
            timestamp: Instant::now(),
            error: error.to_string(),
        });
    }

    fn store_answered(&self) {
        let shared = &self.shared;
        if !shared.degraded.swap(false, Ordering::AcqRel) {
            return;
        }
        tracing::info!(ratelimiter = %shared.name, "rate limit store recovered");
        shared.event_listeners.emit(&RateLimiterEvent::StoreRecovered {
            pattern_name: shared.name.clone(),
            timestamp: Instant::now(),
        });
    }

    fn store(&self) -> Result<&Arc<dyn RateLimitStore>, StoreError> {
        self.shared.store.as_ref().ok_or(StoreError::Unconfigured)
    }

    /// Clears the window and any block for `identifier`, locally and in the store.
    pub async fn reset(&self, identifier: &str) -> Result<(), StoreError> {
        let key = self.key(identifier);
        self.shared.local.reset(&key);
        match &self.shared.store {
            Some(store) => store.reset(&key).await,
            None => Ok(()),
        }
    }

    /// Refuses every request from `identifier` for `duration`.
    pub async fn block(&self, identifier: &str, duration: Duration) -> Result<(), StoreError> {
        let now = self.now();
        let until = now.saturating_add(millis(duration));
        self.store()?.block(&self.key(identifier), until, now).await?;
        tracing::info!(ratelimiter = %self.shared.name, identifier, ?duration, "identifier blocked");
        Ok(())
    }

    /// Lifts a block on `identifier`.
    pub async fn unblock(&self, identifier: &str) -> Result<(), StoreError> {
        self.store()?.unblock(&self.key(identifier)).await
    }

    /// Reads the window of `identifier` without counting a request.
    pub async fn info(
        &self,
        identifier: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitInfo, StoreError> {
        self.store()?
            .info(&self.key(identifier), config.window, self.now())
            .await
    }

    /// Drops local fallback windows that have ended, returning how many were removed.
    pub fn sweep_local(&self) -> usize {
        self.shared.local.sweep(self.now())
    }

    /// Drops expired windows from the store and the local fallback,
    /// returning how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.now();
        let swept = self.shared.store.as_ref().map_or(0, |store| store.sweep(now));
        swept + self.shared.local.sweep(now)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.shared.name)
            .field("prefix", &self.shared.prefix)
            .field("has_store", &self.shared.store.is_some())
            .field("fallback_mode", &self.shared.fallback_mode)
            .field("degraded", &self.is_degraded())
            .finish()
    }
}

/// Builder for [`RateLimiter`].
pub struct RateLimiterBuilder {
    name: String,
    prefix: String,
    store: Option<Arc<dyn RateLimitStore>>,
    fallback_mode: FallbackMode,
    clock: SharedClock,
    event_listeners: EventListeners<RateLimiterEvent>,
}

impl RateLimiterBuilder {
    /// Creates a builder without a store, falling back to local windows.
    pub fn new() -> Self {
        Self {
            name: "ratelimiter".to_string(),
            prefix: "ratelimit".to_string(),
            store: None,
            fallback_mode: FallbackMode::default(),
            clock: Arc::new(SystemClock),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the limiter name.
    ///
    /// Default: "ratelimiter"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the prefix of every store key.
    ///
    /// Limiters that should not share windows need different prefixes.
    ///
    /// Default: "ratelimit"
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the shared store.
    pub fn store<S: RateLimitStore + 'static>(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Sets an already shared store.
    pub fn shared_store(mut self, store: Arc<dyn RateLimitStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets what happens when the store cannot be used.
    ///
    /// Default: [`FallbackMode::LocalWindow`]
    pub fn fallback(mut self, mode: FallbackMode) -> Self {
        self.fallback_mode = mode;
        self
    }

    /// Sets the wall clock used for window timestamps.
    ///
    /// Default: [`SystemClock`]
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Registers a callback for admitted requests.
    pub fn on_allowed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &RateLimiterEvent| {
            if let RateLimiterEvent::Allowed {
                identifier,
                remaining,
                ..
            } = event
            {
                f(identifier, *remaining);
            }
        }));
        self
    }

    /// Registers a callback for refused requests.
    pub fn on_denied<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Option<Duration>) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &RateLimiterEvent| {
            if let RateLimiterEvent::Denied {
                identifier,
                retry_after,
                ..
            } = event
            {
                f(identifier, *retry_after);
            }
        }));
        self
    }

    /// Registers a callback for when the limiter starts deciding locally.
    pub fn on_fallback<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &RateLimiterEvent| {
            if let RateLimiterEvent::FallbackActivated { error, .. } = event {
                f(error);
            }
        }));
        self
    }

    /// Registers a callback for when the store answers again.
    pub fn on_recovered<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &RateLimiterEvent| {
            if let RateLimiterEvent::StoreRecovered { .. } = event {
                f();
            }
        }));
        self
    }

    /// Builds the limiter.
    pub fn build(self) -> RateLimiter {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "ratelimiter_checks_total",
                "Total number of rate limit checks, by outcome and decision source"
            );
            describe_counter!(
                "ratelimiter_fallback_total",
                "Total number of checks decided locally after a store failure"
            );
        });

        RateLimiter {
            shared: Arc::new(Shared {
                name: self.name,
                prefix: self.prefix,
                store: self.store,
                fallback_mode: self.fallback_mode,
                local: LocalWindow::new(),
                clock: self.clock,
                degraded: AtomicBool::new(false),
                event_listeners: self.event_listeners,
            }),
        }
    }
}

impl Default for RateLimiterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
