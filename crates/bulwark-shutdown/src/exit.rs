//! Process termination.

/// Ends the process with a status code.
///
/// The coordinator never calls `std::process::exit` directly; it goes through
/// an `Exit` so tests and embedding runtimes can observe or replace it. Any
/// `Fn(i32)` closure is an `Exit`.
pub trait Exit: Send + Sync {
    /// Terminates with `code`. Implementations other than [`ProcessExit`] may return.
    fn exit(&self, code: i32);
}

/// Calls [`std::process::exit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExit;

impl Exit for ProcessExit {
    fn exit(&self, code: i32) {
        std::process::exit(code)
    }
}

impl<F> Exit for F
where
    F: Fn(i32) + Send + Sync,
{
    fn exit(&self, code: i32) {
        self(code)
    }
}
