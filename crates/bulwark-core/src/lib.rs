//! Core infrastructure for bulwark.
//!
//! This crate holds what every bulwark pattern shares:
//! - Event system for observability ([`events`])
//! - The unified [`ResilienceError`] that all pattern errors convert into
//! - Wall-clock abstraction used where timestamps must be shared across processes ([`clock`])

pub mod clock;
pub mod error;
pub mod events;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{RejectionReason, ResilienceError};
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
