//! Error types for the bulkhead pattern.

use bulwark_core::{RejectionReason, ResilienceError};

/// Error returned by [`Bulkhead::execute`](crate::Bulkhead::execute).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkheadError<E> {
    /// No slot became available; the operation never ran.
    #[error("bulkhead '{name}' rejected the call ({reason})")]
    Rejected {
        /// Resource name of the bulkhead.
        name: String,
        /// Why the call was refused.
        reason: RejectionReason,
    },
    /// The operation ran and returned this error.
    #[error("{0}")]
    Inner(E),
}

impl<E> BulkheadError<E> {
    /// Returns the rejection reason, if the bulkhead refused the call.
    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        match self {
            BulkheadError::Rejected { reason, .. } => Some(*reason),
            BulkheadError::Inner(_) => None,
        }
    }

    /// Returns `true` if the bulkhead refused the call.
    pub fn is_rejected(&self) -> bool {
        matches!(self, BulkheadError::Rejected { .. })
    }

    /// Extracts the operation's own error.
    pub fn into_inner(self) -> Option<E> {
        match self {
            BulkheadError::Inner(e) => Some(e),
            BulkheadError::Rejected { .. } => None,
        }
    }
}

impl<E> From<BulkheadError<E>> for ResilienceError<E> {
    fn from(err: BulkheadError<E>) -> Self {
        match err {
            BulkheadError::Rejected { name, reason } => {
                ResilienceError::BulkheadRejected { name, reason }
            }
            BulkheadError::Inner(e) => ResilienceError::Application(e),
        }
    }
}
