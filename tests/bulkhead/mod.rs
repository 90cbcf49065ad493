//! Tests for the bulkhead pattern.
//!
//! Test organization:
//! - concurrency.rs: slot accounting under concurrent load
//! - timeout.rs: queue wait timeouts and cancellation
//! - registry.rs: presets and per-resource instances

mod concurrency;
mod registry;
mod timeout;
