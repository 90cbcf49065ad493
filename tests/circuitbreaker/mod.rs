//! Tests for the circuit breaker pattern.
//!
//! Test organization:
//! - lifecycle.rs: state machine driven through `execute`
//! - registry.rs: named breakers and health reporting
