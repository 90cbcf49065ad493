//! Composition tests.
//!
//! Test organization:
//! - protect.rs: breaker, retry and bulkhead around one operation
//! - resilience.rs: the application-wide registry and its shutdown hook

mod protect;
mod resilience;
