//! Circuit breaker for fragile downstream dependencies.
//!
//! A breaker counts consecutive failures of one dependency. Once
//! `failure_threshold` failures happen in a row the circuit opens and calls fail
//! fast with [`CircuitBreakerError::OpenCircuit`] without touching the
//! dependency. After `reset_timeout` has passed since the last failure, the
//! next availability check lets calls through again in half-open state:
//! `success_threshold` successes in a row close the circuit, a single failure
//! opens it again.
//!
//! ```text
//!            failures >= failure_threshold
//!   Closed ─────────────────────────────────▶ Open
//!     ▲                                        │
//!     │ successes >= success_threshold         │ reset_timeout elapsed
//!     │                                        ▼ (checked lazily)
//!     └─────────────────────────────────── HalfOpen
//!                  any failure: back to Open
//! ```
//!
//! # Example
//!
//! ```rust
//! use bulwark_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::new(
//!     CircuitBreakerConfig::builder()
//!         .name("database")
//!         .failure_threshold(3)
//!         .reset_timeout(Duration::from_secs(1))
//!         .success_threshold(2)
//!         .on_state_transition(|from, to| println!("database: {from:?} -> {to:?}"))
//!         .build(),
//! );
//!
//! for _ in 0..3 {
//!     let _ = breaker.execute(|| async { Err::<(), _>("connection refused") }).await;
//! }
//! assert_eq!(breaker.state(), CircuitState::Open);
//! # }
//! ```
//!
//! # Failure classification
//!
//! Use [`CircuitBreaker::execute_classified`] or
//! [`CircuitBreakerLayer::failure_classifier`] when only some errors say
//! something about the dependency's health.
//!
//! # Feature Flags
//! - `metrics`: call, transition and state metrics via the `metrics` crate
//! - `tracing`: state transitions logged via `tracing`
//! - `serde`: (de)serialize [`CircuitBreakerThresholds`] and [`CircuitState`]

pub mod breaker;
pub mod circuit;
pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod layer;
pub mod registry;

pub use breaker::CircuitBreaker;
pub use circuit::{CircuitMetrics, CircuitState};
pub use classifier::{DefaultClassifier, FailureClassifier, FnClassifier};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerThresholds};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;
pub use layer::{CircuitBreakerLayer, CircuitBreakerService};
pub use registry::CircuitBreakerRegistry;
