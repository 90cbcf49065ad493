//! The application-wide resilience registry.

use crate::compose::protect;
use bulwark_bulkhead::{BulkheadPreset, BulkheadRegistry, BulkheadStats};
use bulwark_circuitbreaker::{CircuitBreakerRegistry, CircuitBreakerThresholds, CircuitMetrics};
use bulwark_core::ResilienceError;
use bulwark_retry::{RetryConfig, RetryExecutor};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;

#[cfg(feature = "ratelimiter")]
use bulwark_core::{Clock, SystemClock};
#[cfg(feature = "ratelimiter")]
use bulwark_ratelimiter::{RateLimitConfig, RateLimitResult, RateLimiter};
#[cfg(feature = "shutdown")]
use bulwark_shutdown::ShutdownCoordinator;

/// Point-in-time view of every pattern instance in a [`Resilience`].
#[derive(Debug, Clone, Default)]
pub struct ResilienceSnapshot {
    /// Bulkhead statistics by resource name.
    pub bulkheads: BTreeMap<String, BulkheadStats>,
    /// Circuit breaker metrics by dependency name.
    pub circuits: BTreeMap<String, CircuitMetrics>,
    /// Whether a shutdown has started.
    pub shutting_down: bool,
}

/// Everything an application routes fragile work through.
///
/// Owns the bulkhead and circuit breaker registries, a retry executor and,
/// optionally, a rate limiter and shutdown coordinator. Create one at startup
/// and pass clones around; clones share all state.
///
/// ```rust
/// use bulwark::Resilience;
///
/// # async fn example() {
/// let resilience = Resilience::builder().build();
///
/// let reply = resilience
///     .protect("database", || async { Ok::<_, std::io::Error>(42) })
///     .await;
/// assert_eq!(reply.unwrap(), 42);
///
/// resilience.teardown();
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Resilience {
    bulkheads: BulkheadRegistry,
    breakers: CircuitBreakerRegistry,
    retry: RetryExecutor,
    #[cfg(feature = "ratelimiter")]
    rate_limiter: Option<RateLimiter>,
    #[cfg(feature = "shutdown")]
    shutdown: Option<ShutdownCoordinator>,
}

impl Resilience {
    /// Creates a new builder.
    pub fn builder() -> ResilienceBuilder {
        ResilienceBuilder::new()
    }

    /// Bulkheads by resource name.
    pub fn bulkheads(&self) -> &BulkheadRegistry {
        &self.bulkheads
    }

    /// Circuit breakers by dependency name.
    pub fn breakers(&self) -> &CircuitBreakerRegistry {
        &self.breakers
    }

    /// The shared retry executor.
    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    /// The rate limiter, if one was configured.
    #[cfg(feature = "ratelimiter")]
    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.rate_limiter.as_ref()
    }

    /// The shutdown coordinator, if one was configured.
    #[cfg(feature = "shutdown")]
    pub fn shutdown(&self) -> Option<&ShutdownCoordinator> {
        self.shutdown.as_ref()
    }

    /// Returns `true` once the shutdown coordinator has started a shutdown.
    pub fn is_shutting_down(&self) -> bool {
        #[cfg(feature = "shutdown")]
        if let Some(coordinator) = &self.shutdown {
            return coordinator.is_shutting_down();
        }
        false
    }

    /// Runs `op` against `name` through its circuit breaker, the retry
    /// executor and its bulkhead.
    ///
    /// The breaker and bulkhead for `name` are created on first use. Fails with
    /// [`ResilienceError::ShuttingDown`] once a shutdown has started.
    pub async fn protect<F, Fut, T, E>(&self, name: &str, op: F) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + 'static,
    {
        if self.is_shutting_down() {
            return Err(ResilienceError::ShuttingDown);
        }
        let breaker = self.breakers.get_or_create(name);
        let bulkhead = self.bulkheads.get_or_create(name);
        protect(&breaker, &self.retry, &bulkhead, op).await
    }

    /// Checks `identifier` against `config`.
    ///
    /// Without a configured rate limiter every request is allowed, with the
    /// window reported as ending one `config.window` from now.
    #[cfg(feature = "ratelimiter")]
    pub async fn check_rate(&self, identifier: &str, config: &RateLimitConfig) -> RateLimitResult {
        match &self.rate_limiter {
            Some(limiter) => limiter.check(identifier, config).await,
            None => {
                let window = u64::try_from(config.window.as_millis()).unwrap_or(u64::MAX);
                RateLimitResult {
                    allowed: true,
                    limit: config.limit,
                    remaining: config.limit,
                    reset_at: SystemClock.now_millis().saturating_add(window),
                    retry_after: None,
                }
            }
        }
    }

    /// Statistics of every bulkhead and breaker created so far.
    pub fn snapshot(&self) -> ResilienceSnapshot {
        ResilienceSnapshot {
            bulkheads: self.bulkheads.all_stats(),
            circuits: self.breakers.all_metrics(),
            shutting_down: self.is_shutting_down(),
        }
    }

    /// Forgets every bulkhead and circuit breaker.
    ///
    /// Handles obtained earlier keep working but are no longer shared with
    /// instances created afterwards.
    pub fn teardown(&self) {
        self.bulkheads.clear();
        self.breakers.teardown();

        #[cfg(feature = "tracing")]
        tracing::debug!("resilience registries torn down");
    }
}

/// Builder for [`Resilience`].
pub struct ResilienceBuilder {
    bulkhead_preset: BulkheadPreset,
    thresholds: CircuitBreakerThresholds,
    retry: RetryConfig,
    #[cfg(feature = "ratelimiter")]
    rate_limiter: Option<RateLimiter>,
    #[cfg(feature = "shutdown")]
    shutdown: Option<(ShutdownCoordinator, i32)>,
}

impl ResilienceBuilder {
    /// Creates a builder with default presets and thresholds.
    pub fn new() -> Self {
        Self {
            bulkhead_preset: BulkheadPreset::DEFAULT,
            thresholds: CircuitBreakerThresholds::default(),
            retry: RetryConfig::default(),
            #[cfg(feature = "ratelimiter")]
            rate_limiter: None,
            #[cfg(feature = "shutdown")]
            shutdown: None,
        }
    }

    /// Limits for bulkheads whose name matches no preset.
    ///
    /// Default: [`BulkheadPreset::DEFAULT`]
    pub fn bulkhead_preset(mut self, preset: BulkheadPreset) -> Self {
        self.bulkhead_preset = preset;
        self
    }

    /// Thresholds for lazily created circuit breakers.
    pub fn circuit_thresholds(mut self, thresholds: CircuitBreakerThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Configuration of the shared retry executor.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Gates requests through `limiter` in [`Resilience::check_rate`].
    #[cfg(feature = "ratelimiter")]
    pub fn rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Tears the registries down as part of `coordinator`'s shutdown, at
    /// `priority`, and refuses new work once it starts.
    #[cfg(feature = "shutdown")]
    pub fn shutdown(mut self, coordinator: ShutdownCoordinator, priority: i32) -> Self {
        self.shutdown = Some((coordinator, priority));
        self
    }

    /// Builds the registry.
    pub fn build(self) -> Resilience {
        let resilience = Resilience {
            bulkheads: BulkheadRegistry::with_default_preset(self.bulkhead_preset),
            breakers: CircuitBreakerRegistry::with_defaults(self.thresholds),
            retry: RetryExecutor::new(self.retry),
            #[cfg(feature = "ratelimiter")]
            rate_limiter: self.rate_limiter,
            #[cfg(feature = "shutdown")]
            shutdown: None,
        };

        #[cfg(feature = "shutdown")]
        if let Some((coordinator, priority)) = self.shutdown {
            let registries = resilience.clone();
            coordinator.register("resilience", priority, move || async move {
                registries.teardown();
                Ok::<_, bulwark_shutdown::BoxError>(())
            });
            return Resilience {
                shutdown: Some(coordinator),
                ..resilience
            };
        }

        resilience
    }
}

impl Default for ResilienceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
