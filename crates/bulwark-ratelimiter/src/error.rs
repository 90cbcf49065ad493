use bulwark_core::ResilienceError;
use std::time::Duration;

/// A failure talking to the shared rate limit store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The limiter has no shared store configured.
    #[error("no rate limit store configured")]
    Unconfigured,
    /// The store could not be reached or rejected the command.
    #[error("rate limit store unavailable: {0}")]
    Unavailable(String),
    /// The store answered with something the limiter does not understand.
    #[error("unexpected rate limit store reply: {0}")]
    InvalidReply(String),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Errors returned by [`RateLimitService`](crate::RateLimitService).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError<E> {
    /// The request was not admitted.
    #[error("rate limited")]
    Limited {
        /// How long to wait before trying again.
        retry_after: Option<Duration>,
    },
    /// The inner service failed.
    #[error("{0}")]
    Inner(E),
}

impl<E> RateLimitError<E> {
    /// Returns `true` if the request was refused by the limiter.
    pub fn is_limited(&self) -> bool {
        matches!(self, RateLimitError::Limited { .. })
    }
}

impl<E> From<RateLimitError<E>> for ResilienceError<E> {
    fn from(err: RateLimitError<E>) -> Self {
        match err {
            RateLimitError::Limited { retry_after } => ResilienceError::RateLimited { retry_after },
            RateLimitError::Inner(e) => ResilienceError::Application(e),
        }
    }
}
