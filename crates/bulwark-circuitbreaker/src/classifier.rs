//! Deciding which errors count against a dependency's health.
//!
//! Not every error means the dependency is sick: a validation error or a 404
//! says nothing about availability. A [`FailureClassifier`] lets the caller
//! pick which errors move the breaker towards Open. Errors it rejects are
//! recorded as successes but are still returned to the caller unchanged.

/// Decides whether an error counts as a failure for state purposes.
pub trait FailureClassifier<E>: Send + Sync {
    /// Returns `true` if `error` should count as a failure.
    fn is_failure(&self, error: &E) -> bool;
}

/// Counts every error as a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl<E> FailureClassifier<E> for DefaultClassifier {
    fn is_failure(&self, _error: &E) -> bool {
        true
    }
}

/// A classifier backed by a closure.
///
/// ```rust
/// use bulwark_circuitbreaker::classifier::{FailureClassifier, FnClassifier};
/// use std::io::{Error, ErrorKind};
///
/// // Missing records are the caller's problem, not the database's.
/// let classifier = FnClassifier::new(|e: &Error| e.kind() != ErrorKind::NotFound);
///
/// assert!(!classifier.is_failure(&Error::new(ErrorKind::NotFound, "no row")));
/// assert!(classifier.is_failure(&Error::new(ErrorKind::ConnectionReset, "reset")));
/// ```
#[derive(Clone)]
pub struct FnClassifier<F> {
    f: F,
}

impl<F> FnClassifier<F> {
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<E, F> FailureClassifier<E> for FnClassifier<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn is_failure(&self, error: &E) -> bool {
        (self.f)(error)
    }
}

impl<F> std::fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnClassifier").finish_non_exhaustive()
    }
}
