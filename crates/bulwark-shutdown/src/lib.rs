//! Graceful shutdown coordination.
//!
//! Subsystems register cleanup handlers with a priority when they start. When
//! the process is told to stop (a signal, a fatal error, or an explicit call)
//! the [`ShutdownCoordinator`] runs them once, highest priority first, under a
//! watchdog timeout:
//!
//! - a failing or panicking handler is logged and the sequence continues,
//!   unless [`abort_on_error`](ShutdownConfigBuilder::abort_on_error) is set
//! - if the watchdog fires, the process exits immediately with the force exit
//!   code and the remaining handlers never run
//! - otherwise the process exits with 0, or 1 if any handler failed
//!
//! Exiting goes through the [`Exit`] trait. Tests pass a closure to observe the
//! exit code; hosts that manage the process themselves disable exiting with
//! [`exit_on_complete(false)`](ShutdownConfigBuilder::exit_on_complete) and use
//! the returned [`ShutdownReport`].
//!
//! ```rust
//! use bulwark_shutdown::{ShutdownConfig, ShutdownCoordinator, ShutdownTrigger};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let config = ShutdownConfig::builder()
//!     .timeout(Duration::from_secs(5))
//!     .exit_on_complete(false)
//!     .build();
//! let coordinator = ShutdownCoordinator::new(config);
//!
//! coordinator.register("flush-queue", 50, || async { Ok::<_, std::io::Error>(()) });
//!
//! if let Some(report) = coordinator.shutdown(ShutdownTrigger::Manual).await {
//!     assert!(report.is_clean());
//! }
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod exit;
pub mod trigger;

pub use config::{ShutdownConfig, ShutdownConfigBuilder};
pub use coordinator::{ShutdownCoordinator, ShutdownReport, ShutdownStatus};
pub use error::{BoxError, HandlerFailure};
pub use events::ShutdownEvent;
pub use exit::{Exit, ProcessExit};
pub use trigger::ShutdownTrigger;
