//! Which errors are worth another attempt.

use std::any::Any;
use std::fmt::Display;
use std::io;

/// Decides whether a failed attempt should be retried.
pub trait RetryClassifier<E>: Send + Sync {
    /// Returns `true` if `error` is transient.
    fn is_retryable(&self, error: &E) -> bool;
}

/// Retries network errors, timeouts and overload responses.
///
/// `std::io::Error` is classified by [`io::ErrorKind`]; any other error by its
/// `Display` text (see [`is_retryable_message`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRetryClassifier;

impl<E> RetryClassifier<E> for DefaultRetryClassifier
where
    E: Display + 'static,
{
    fn is_retryable(&self, error: &E) -> bool {
        if let Some(io_error) = (error as &dyn Any).downcast_ref::<io::Error>() {
            return is_retryable_io(io_error);
        }
        is_retryable_message(&error.to_string())
    }
}

/// A classifier backed by a closure.
#[derive(Clone)]
pub struct FnRetryClassifier<F> {
    f: F,
}

impl<F> FnRetryClassifier<F> {
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<E, F> RetryClassifier<E> for FnRetryClassifier<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn is_retryable(&self, error: &E) -> bool {
        (self.f)(error)
    }
}

impl<F> std::fmt::Debug for FnRetryClassifier<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnRetryClassifier").finish_non_exhaustive()
    }
}

/// Transient I/O failures: broken connections and timeouts.
pub fn is_retryable_io(error: &io::Error) -> bool {
    match error.kind() {
        io::ErrorKind::TimedOut
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => true,
        _ => is_retryable_message(&error.to_string()),
    }
}

const RETRYABLE_PATTERNS: &[&str] = &[
    "network",
    "timeout",
    "timed out",
    "econnreset",
    "econnrefused",
    "etimedout",
    "connection reset",
    "connection refused",
    "connection closed",
    "socket hang up",
    "temporarily unavailable",
    "too many requests",
    "bad gateway",
    "service unavailable",
    "gateway timeout",
    "429",
    "502",
    "503",
    "504",
];

/// Matches error text against known transient signatures, case-insensitively.
///
/// ```rust
/// use bulwark_retry::classifier::is_retryable_message;
///
/// assert!(is_retryable_message("HTTP 503 Service Unavailable"));
/// assert!(is_retryable_message("request timed out after 30s"));
/// assert!(!is_retryable_message("invalid api key"));
/// ```
pub fn is_retryable_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    RETRYABLE_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}
