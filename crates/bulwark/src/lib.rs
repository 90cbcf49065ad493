//! Resilience and concurrency control for services that call fragile or
//! expensive dependencies.
//!
//! `bulwark` collects the individual pattern crates behind feature flags:
//!
//! - **Bulkhead** (`bulkhead` feature): caps concurrent calls per resource and
//!   queues overflow up to a bound, with a wait timeout
//! - **Circuit Breaker** (`circuitbreaker` feature): stops calling a failing
//!   dependency until a probe succeeds
//! - **Retry** (`retry` feature): exponential backoff with jitter for
//!   transient errors
//! - **Rate Limiter** (`ratelimiter` feature): sliding window admission shared
//!   across processes through a store, with local fallback
//! - **Shutdown** (`shutdown` feature): priority-ordered cleanup under a
//!   watchdog timeout
//!
//! With the `compose` feature, [`protect`] runs one operation through a
//! breaker, a retry executor and a bulkhead, and [`Resilience`] keeps one
//! breaker and one bulkhead per name for the whole application.
//!
//! ```toml
//! [dependencies]
//! bulwark = { version = "0.1", features = ["full"] }
//! ```
//!
//! ```rust,no_run
//! # #[cfg(all(feature = "compose", feature = "shutdown"))]
//! # {
//! use bulwark::shutdown::{ShutdownConfig, ShutdownCoordinator};
//! use bulwark::Resilience;
//!
//! # async fn example() {
//! let coordinator = ShutdownCoordinator::new(ShutdownConfig::default());
//! let resilience = Resilience::builder().shutdown(coordinator.clone(), 0).build();
//! coordinator.listen_for_signals();
//!
//! let rows = resilience
//!     .protect("database", || async { Ok::<_, std::io::Error>(vec![1, 2, 3]) })
//!     .await;
//! # }
//! # }
//! ```
//!
//! Every pattern error converts into [`ResilienceError`], so a call site can
//! tell rejections from application failures without knowing which pattern
//! produced them.

// Re-export core (always available)
pub use bulwark_core as core;
pub use bulwark_core::{RejectionReason, ResilienceError};

// Re-export patterns based on features
#[cfg(feature = "bulkhead")]
pub use bulwark_bulkhead as bulkhead;

#[cfg(feature = "circuitbreaker")]
pub use bulwark_circuitbreaker as circuitbreaker;

#[cfg(feature = "ratelimiter")]
pub use bulwark_ratelimiter as ratelimiter;

#[cfg(feature = "retry")]
pub use bulwark_retry as retry;

#[cfg(feature = "shutdown")]
pub use bulwark_shutdown as shutdown;

#[cfg(feature = "compose")]
mod compose;
#[cfg(feature = "compose")]
mod resilience;

#[cfg(feature = "compose")]
pub use compose::protect;
#[cfg(feature = "compose")]
pub use resilience::{Resilience, ResilienceBuilder, ResilienceSnapshot};
