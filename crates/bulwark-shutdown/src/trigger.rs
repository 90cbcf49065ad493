use std::fmt;

/// Why a shutdown was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// An OS signal, by name (`SIGTERM`, `SIGINT`).
    Signal(String),
    /// An unrecoverable error, with its message.
    Fatal(String),
    /// Requested by the application.
    Manual,
}

impl ShutdownTrigger {
    /// Creates a signal trigger.
    pub fn signal(name: impl Into<String>) -> Self {
        ShutdownTrigger::Signal(name.into())
    }

    /// Returns `true` for [`ShutdownTrigger::Fatal`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShutdownTrigger::Fatal(_))
    }
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownTrigger::Signal(name) => write!(f, "signal {name}"),
            ShutdownTrigger::Fatal(message) => write!(f, "fatal error: {message}"),
            ShutdownTrigger::Manual => f.write_str("manual"),
        }
    }
}
