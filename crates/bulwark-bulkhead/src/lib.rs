//! Bulkhead pattern: per-resource concurrency isolation.
//!
//! A bulkhead caps how many operations against one resource pool (LLM calls,
//! database connections, outbound messaging) run at once. Callers that find every
//! slot busy wait in a bounded FIFO queue; a caller is rejected when the queue is
//! full or when it has waited longer than the configured timeout. A rejected
//! operation is never started.
//!
//! # Basic Example
//!
//! ```rust
//! use bulwark_bulkhead::{Bulkhead, BulkheadConfig, BulkheadError};
//! use bulwark_core::RejectionReason;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let bulkhead = Bulkhead::new(
//!     BulkheadConfig::builder()
//!         .name("llm")
//!         .max_concurrent(20)
//!         .max_queue(50)
//!         .wait_timeout(Duration::from_secs(60))
//!         .build(),
//! );
//!
//! match bulkhead.execute(|| async { Ok::<_, std::io::Error>("completion") }).await {
//!     Ok(text) => println!("{text}"),
//!     Err(BulkheadError::Rejected { reason: RejectionReason::Full, .. }) => println!("overloaded"),
//!     Err(BulkheadError::Rejected { reason: RejectionReason::Timeout, .. }) => println!("waited too long"),
//!     Err(BulkheadError::Inner(e)) => println!("call failed: {e}"),
//! }
//! # }
//! ```
//!
//! # Presets and the registry
//!
//! [`BulkheadRegistry`] hands out one bulkhead per resource name, configured from
//! the matching [`BulkheadPreset`]:
//!
//! ```rust
//! use bulwark_bulkhead::BulkheadRegistry;
//!
//! # async fn example() {
//! let registry = BulkheadRegistry::new();
//! let rows = registry
//!     .get_or_create("database")
//!     .execute(|| async { Ok::<_, String>(vec![1, 2, 3]) })
//!     .await;
//!
//! for (name, stats) in registry.all_stats() {
//!     println!("{name}: {} active, {} queued", stats.active, stats.queued);
//! }
//! # }
//! ```
//!
//! # Tower
//!
//! [`BulkheadLayer`] wraps a `tower::Service` so each request runs inside the
//! bulkhead; errors become [`BulkheadError<S::Error>`].

pub mod bulkhead;
pub mod config;
pub mod error;
pub mod events;
pub mod layer;
pub mod presets;
pub mod registry;

pub use bulkhead::{Bulkhead, BulkheadStats};
pub use bulwark_core::RejectionReason;
pub use config::{BulkheadConfig, BulkheadConfigBuilder};
pub use error::BulkheadError;
pub use events::BulkheadEvent;
pub use layer::{BulkheadLayer, BulkheadService};
pub use presets::BulkheadPreset;
pub use registry::BulkheadRegistry;
