use crate::circuit::CircuitState;
use crate::events::CircuitBreakerEvent;
use bulwark_core::events::{EventListeners, FnListener};
use std::time::Duration;

/// Thresholds of one circuit breaker, without listeners.
///
/// With the `serde` feature these can be loaded from application configuration
/// and turned into a builder with [`CircuitBreakerThresholds::builder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CircuitBreakerThresholds {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before allowing a probe.
    pub reset_timeout: Duration,
    /// Consecutive half-open successes that close the circuit.
    pub success_threshold: u32,
}

impl CircuitBreakerThresholds {
    /// Starts a builder with these thresholds.
    pub fn builder(self) -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfig::builder()
            .failure_threshold(self.failure_threshold)
            .reset_timeout(self.reset_timeout)
            .success_threshold(self.success_threshold)
    }
}

impl Default for CircuitBreakerThresholds {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            success_threshold: 2,
        }
    }
}

/// Configuration for a circuit breaker.
#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    pub(crate) name: String,
    pub(crate) failure_threshold: u32,
    pub(crate) reset_timeout: Duration,
    pub(crate) success_threshold: u32,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Name of the protected dependency.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The thresholds of this configuration.
    pub fn thresholds(&self) -> CircuitBreakerThresholds {
        CircuitBreakerThresholds {
            failure_threshold: self.failure_threshold,
            reset_timeout: self.reset_timeout,
            success_threshold: self.success_threshold,
        }
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder {
    name: String,
    failure_threshold: u32,
    reset_timeout: Duration,
    success_threshold: u32,
    event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        let defaults = CircuitBreakerThresholds::default();
        Self {
            name: "circuitbreaker".to_string(),
            failure_threshold: defaults.failure_threshold,
            reset_timeout: defaults.reset_timeout,
            success_threshold: defaults.success_threshold,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name of the protected dependency.
    ///
    /// Default: "circuitbreaker"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets how many consecutive failures open the circuit.
    ///
    /// Values below 1 are raised to 1. Default: 5
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets how long the circuit stays open, measured from the last failure,
    /// before the next call is let through as a half-open probe.
    ///
    /// Default: 60 seconds
    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// Sets how many consecutive successes in half-open close the circuit.
    ///
    /// Values below 1 are raised to 1. Default: 2
    pub fn success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Registers a callback invoked on every state transition.
    ///
    /// # Example
    /// ```rust
    /// use bulwark_circuitbreaker::{CircuitBreakerConfig, CircuitState};
    ///
    /// let config = CircuitBreakerConfig::builder()
    ///     .name("gemini")
    ///     .on_state_transition(|from, to| {
    ///         if to == CircuitState::Open {
    ///             eprintln!("gemini unavailable (was {from:?})");
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::StateTransition {
                from_state,
                to_state,
                ..
            } = event
            {
                f(*from_state, *to_state);
            }
        }));
        self
    }

    /// Registers a callback invoked when a call is rejected by an open circuit.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::CallRejected { .. } = event {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked with the current state when a success is recorded.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::SuccessRecorded { state, .. } = event {
                f(*state);
            }
        }));
        self
    }

    /// Registers a callback invoked with the current state when a failure is recorded.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::FailureRecorded { state, .. } = event {
                f(*state);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            name: self.name,
            failure_threshold: self.failure_threshold.max(1),
            reset_timeout: self.reset_timeout,
            success_threshold: self.success_threshold.max(1),
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
