//! One circuit breaker per protected dependency.

use crate::breaker::CircuitBreaker;
use crate::circuit::{CircuitMetrics, CircuitState};
use crate::config::{CircuitBreakerConfig, CircuitBreakerThresholds};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// Owns the circuit breakers of an application, keyed by dependency name.
///
/// Breakers requested with [`get_or_create`](Self::get_or_create) use the
/// registry's default thresholds; dependencies that need different ones are
/// added with [`register`](Self::register). Clones share the same breakers.
#[derive(Clone, Debug, Default)]
pub struct CircuitBreakerRegistry {
    breakers: Arc<RwLock<HashMap<String, CircuitBreaker>>>,
    defaults: CircuitBreakerThresholds,
}

impl CircuitBreakerRegistry {
    /// Creates an empty registry with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry whose lazily created breakers use `defaults`.
    pub fn with_defaults(defaults: CircuitBreakerThresholds) -> Self {
        Self {
            breakers: Arc::default(),
            defaults,
        }
    }

    /// Returns the breaker for `name`, creating it on first use.
    pub fn get_or_create(&self, name: &str) -> CircuitBreaker {
        if let Some(existing) = self.get(name) {
            return existing;
        }

        self.breakers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_insert_with(|| CircuitBreaker::new(self.defaults.builder().name(name).build()))
            .clone()
    }

    /// Adds a breaker built from `config`, replacing any breaker with the same name.
    pub fn register(&self, config: CircuitBreakerConfig) -> CircuitBreaker {
        let breaker = CircuitBreaker::new(config);
        self.breakers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(breaker.name().to_string(), breaker.clone());
        breaker
    }

    /// Returns the breaker for `name` if one exists.
    pub fn get(&self, name: &str) -> Option<CircuitBreaker> {
        self.breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Current state of every breaker.
    pub fn states(&self) -> BTreeMap<String, CircuitState> {
        self.breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.state()))
            .collect()
    }

    /// Metrics snapshot of every breaker.
    pub fn all_metrics(&self) -> BTreeMap<String, CircuitMetrics> {
        self.breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.metrics()))
            .collect()
    }

    /// Closes every breaker.
    pub fn reset_all(&self) {
        for breaker in self
            .breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
        {
            breaker.reset();
        }
    }

    /// Forgets every breaker.
    pub fn teardown(&self) {
        self.breakers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
