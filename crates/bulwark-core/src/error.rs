//! The unified error type for composed bulwark patterns.
//!
//! When an operation runs through several patterns (circuit breaker, retry,
//! bulkhead, rate limiter) each one has its own error enum. Every one of them
//! converts into [`ResilienceError<E>`], so a call site can use `?` across the
//! whole stack and still tell a rejection apart from an application failure.
//!
//! ```
//! use bulwark_core::{RejectionReason, ResilienceError};
//!
//! # #[derive(Debug)]
//! # struct AppError;
//! fn describe(error: &ResilienceError<AppError>) -> &'static str {
//!     match error {
//!         ResilienceError::CircuitOpen { .. } => "dependency unavailable",
//!         ResilienceError::BulkheadRejected { reason: RejectionReason::Full, .. } => "overloaded",
//!         ResilienceError::BulkheadRejected { reason: RejectionReason::Timeout, .. } => "too slow",
//!         ResilienceError::RateLimited { .. } => "slow down",
//!         ResilienceError::ShuttingDown => "going away",
//!         ResilienceError::Application(_) => "failed",
//!     }
//! }
//! ```

use std::fmt;
use std::time::Duration;

/// Why a bulkhead refused to run an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// All slots were busy and the wait queue was at capacity.
    Full,
    /// The operation waited in the queue longer than the configured wait timeout.
    Timeout,
}

impl RejectionReason {
    /// Returns the lowercase label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::Full => "full",
            RejectionReason::Timeout => "timeout",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A common error type that wraps every pattern's rejection plus the
/// application's own error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResilienceError<E> {
    /// A circuit breaker refused the call without invoking the operation.
    #[error("circuit breaker '{name}' is open")]
    CircuitOpen {
        /// Name of the protected dependency.
        name: String,
    },

    /// A bulkhead refused the call without invoking the operation.
    #[error("bulkhead '{name}' rejected the call ({reason})")]
    BulkheadRejected {
        /// Resource name of the bulkhead.
        name: String,
        /// Why the call was refused.
        reason: RejectionReason,
    },

    /// A rate limiter refused admission.
    #[error("rate limited{}", .retry_after.map(|d| format!(", retry after {d:?}")).unwrap_or_default())]
    RateLimited {
        /// How long to wait before trying again, if known.
        retry_after: Option<Duration>,
    },

    /// The process is shutting down and no longer accepts work.
    #[error("shutting down")]
    ShuttingDown,

    /// The operation itself failed.
    #[error("application error: {0}")]
    Application(E),
}

impl<E> ResilienceError<E> {
    /// Returns `true` if this is a circuit breaker rejection.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    /// Returns `true` if this is a bulkhead rejection of any reason.
    pub fn is_bulkhead_rejected(&self) -> bool {
        matches!(self, ResilienceError::BulkheadRejected { .. })
    }

    /// Returns `true` if this is a rate limiter rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ResilienceError::RateLimited { .. })
    }

    /// Returns `true` if a pattern refused the call, i.e. the operation never ran.
    pub fn is_rejection(&self) -> bool {
        !self.is_application()
    }

    /// Returns `true` if this is an application error.
    pub fn is_application(&self) -> bool {
        matches!(self, ResilienceError::Application(_))
    }

    /// Extracts the application error, if this is an `Application` variant.
    pub fn application_error(self) -> Option<E> {
        match self {
            ResilienceError::Application(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the application error using a function.
    ///
    /// ```
    /// use bulwark_core::ResilienceError;
    ///
    /// let err: ResilienceError<String> = ResilienceError::Application("error".to_string());
    /// let mapped: ResilienceError<usize> = err.map_application(|s| s.len());
    /// assert_eq!(mapped.application_error(), Some(5));
    /// ```
    pub fn map_application<F, T>(self, f: F) -> ResilienceError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            ResilienceError::CircuitOpen { name } => ResilienceError::CircuitOpen { name },
            ResilienceError::BulkheadRejected { name, reason } => {
                ResilienceError::BulkheadRejected { name, reason }
            }
            ResilienceError::RateLimited { retry_after } => {
                ResilienceError::RateLimited { retry_after }
            }
            ResilienceError::ShuttingDown => ResilienceError::ShuttingDown,
            ResilienceError::Application(e) => ResilienceError::Application(f(e)),
        }
    }
}
