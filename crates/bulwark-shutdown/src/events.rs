//! Events emitted during shutdown.

use crate::trigger::ShutdownTrigger;
use bulwark_core::events::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by [`ShutdownCoordinator`](crate::ShutdownCoordinator).
#[derive(Debug, Clone)]
pub enum ShutdownEvent {
    /// Shutdown began.
    Started {
        pattern_name: String,
        timestamp: Instant,
        trigger: ShutdownTrigger,
        handlers: usize,
    },
    /// A handler completed.
    HandlerCompleted {
        pattern_name: String,
        timestamp: Instant,
        handler: String,
        duration: Duration,
    },
    /// A handler returned an error or panicked.
    HandlerFailed {
        pattern_name: String,
        timestamp: Instant,
        handler: String,
        message: String,
    },
    /// Every handler ran, or the sequence was aborted after a failure.
    Completed {
        pattern_name: String,
        timestamp: Instant,
        exit_code: i32,
        duration: Duration,
    },
    /// The watchdog fired before the handlers finished.
    TimedOut {
        pattern_name: String,
        timestamp: Instant,
        exit_code: i32,
    },
}

impl ResilienceEvent for ShutdownEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShutdownEvent::Started { .. } => "started",
            ShutdownEvent::HandlerCompleted { .. } => "handler_completed",
            ShutdownEvent::HandlerFailed { .. } => "handler_failed",
            ShutdownEvent::Completed { .. } => "completed",
            ShutdownEvent::TimedOut { .. } => "timed_out",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ShutdownEvent::Started { timestamp, .. }
            | ShutdownEvent::HandlerCompleted { timestamp, .. }
            | ShutdownEvent::HandlerFailed { timestamp, .. }
            | ShutdownEvent::Completed { timestamp, .. }
            | ShutdownEvent::TimedOut { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            ShutdownEvent::Started { pattern_name, .. }
            | ShutdownEvent::HandlerCompleted { pattern_name, .. }
            | ShutdownEvent::HandlerFailed { pattern_name, .. }
            | ShutdownEvent::Completed { pattern_name, .. }
            | ShutdownEvent::TimedOut { pattern_name, .. } => pattern_name,
        }
    }
}
