use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CircuitState {
    /// Calls flow through and failures are counted.
    Closed = 0,
    /// Calls are rejected without touching the dependency.
    Open = 1,
    /// Probe calls are let through to test whether the dependency recovered.
    HalfOpen = 2,
}

impl CircuitState {
    /// Returns the label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

/// Snapshot of circuit breaker metrics for observability.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitMetrics {
    /// Current state of the circuit breaker.
    pub state: CircuitState,
    /// Failures since the last success while closed.
    pub consecutive_failures: u32,
    /// Successes since entering half-open.
    pub half_open_successes: u32,
    /// Successes recorded since creation or the last reset.
    pub total_successes: u64,
    /// Failures recorded since creation or the last reset.
    pub total_failures: u64,
    /// Calls rejected because the circuit was open.
    pub total_rejections: u64,
    /// Time since the last state transition.
    pub time_since_state_change: Duration,
    /// Time left before the next call is let through, when open.
    pub time_until_half_open: Option<Duration>,
}

pub(crate) struct Circuit {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    last_failure: Option<Instant>,
    last_state_change: Instant,
    total_successes: u64,
    total_failures: u64,
    total_rejections: u64,
}

impl Circuit {
    pub(crate) fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            half_open_successes: 0,
            last_failure: None,
            last_state_change: Instant::now(),
            total_successes: 0,
            total_failures: 0,
            total_rejections: 0,
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn metrics(&self, config: &CircuitBreakerConfig) -> CircuitMetrics {
        CircuitMetrics {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            half_open_successes: self.half_open_successes,
            total_successes: self.total_successes,
            total_failures: self.total_failures,
            total_rejections: self.total_rejections,
            time_since_state_change: self.last_state_change.elapsed(),
            time_until_half_open: match self.state {
                CircuitState::Open => Some(
                    config
                        .reset_timeout
                        .saturating_sub(self.since_last_failure()),
                ),
                _ => None,
            },
        }
    }

    fn since_last_failure(&self) -> Duration {
        self.last_failure
            .map(|at| at.elapsed())
            .unwrap_or(Duration::MAX)
    }

    /// Moves Open to HalfOpen once the reset timeout has elapsed since the last failure.
    fn refresh(&mut self, config: &CircuitBreakerConfig) {
        if self.state == CircuitState::Open && self.since_last_failure() >= config.reset_timeout {
            self.transition_to(CircuitState::HalfOpen, config);
        }
    }

    /// Whether a call would be admitted, without recording anything.
    pub(crate) fn is_available(&mut self, config: &CircuitBreakerConfig) -> bool {
        self.refresh(config);
        self.state != CircuitState::Open
    }

    /// Decides whether a call may proceed and records the decision.
    pub(crate) fn try_acquire(&mut self, config: &CircuitBreakerConfig) -> bool {
        self.refresh(config);

        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => {
                config
                    .event_listeners
                    .emit(&CircuitBreakerEvent::CallPermitted {
                        pattern_name: config.name.clone(),
                        timestamp: std::time::Instant::now(),
                        state: self.state,
                    });
                true
            }
            CircuitState::Open => {
                self.total_rejections += 1;
                config
                    .event_listeners
                    .emit(&CircuitBreakerEvent::CallRejected {
                        pattern_name: config.name.clone(),
                        timestamp: std::time::Instant::now(),
                    });

                #[cfg(feature = "metrics")]
                counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "rejected").increment(1);

                false
            }
        }
    }

    pub(crate) fn record_success(&mut self, config: &CircuitBreakerConfig) {
        self.total_successes += 1;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::SuccessRecorded {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "success").increment(1);

        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                self.half_open_successes += 1;
                if self.half_open_successes >= config.success_threshold {
                    self.transition_to(CircuitState::Closed, config);
                }
            }
            // A call admitted before the circuit opened; it does not close it.
            CircuitState::Open => {}
        }
    }

    pub(crate) fn record_failure(&mut self, config: &CircuitBreakerConfig) {
        self.total_failures += 1;
        self.last_failure = Some(Instant::now());

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::FailureRecorded {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "failure").increment(1);

        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= config.failure_threshold {
                    self.transition_to(CircuitState::Open, config);
                }
            }
            CircuitState::HalfOpen => {
                self.transition_to(CircuitState::Open, config);
            }
            CircuitState::Open => {}
        }
    }

    pub(crate) fn force_open(&mut self, config: &CircuitBreakerConfig) {
        self.last_failure = Some(Instant::now());
        self.transition_to(CircuitState::Open, config);
    }

    pub(crate) fn reset(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
        self.last_failure = None;
        self.total_successes = 0;
        self.total_failures = 0;
        self.total_rejections = 0;
    }

    fn transition_to(&mut self, state: CircuitState, config: &CircuitBreakerConfig) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                from_state,
                to_state: state,
            });

        #[cfg(feature = "tracing")]
        match state {
            CircuitState::Open => tracing::warn!(
                breaker = %config.name,
                from = from_state.as_str(),
                consecutive_failures = self.consecutive_failures,
                "circuit opened"
            ),
            _ => tracing::info!(
                breaker = %config.name,
                from = from_state.as_str(),
                to = state.as_str(),
                "circuit state transition"
            ),
        }

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => config.name.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);

            gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone())
                .set(state as u8 as f64);
        }

        self.state = state;
        self.last_state_change = Instant::now();
        self.consecutive_failures = 0;
        self.half_open_successes = 0;
    }
}
