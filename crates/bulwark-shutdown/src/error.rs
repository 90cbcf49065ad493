use thiserror::Error;

/// Error type returned by shutdown handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A handler that did not complete cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("shutdown handler '{name}' failed: {message}")]
pub struct HandlerFailure {
    /// Handler name.
    pub name: String,
    /// The error or panic message.
    pub message: String,
}
