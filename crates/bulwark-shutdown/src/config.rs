use crate::events::ShutdownEvent;
use crate::trigger::ShutdownTrigger;
use bulwark_core::events::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for a [`ShutdownCoordinator`](crate::ShutdownCoordinator).
#[derive(Clone, Debug)]
pub struct ShutdownConfig {
    pub(crate) name: String,
    pub(crate) timeout: Duration,
    pub(crate) abort_on_error: bool,
    pub(crate) exit_on_complete: bool,
    pub(crate) success_exit_code: i32,
    pub(crate) failure_exit_code: i32,
    pub(crate) force_exit_code: i32,
    pub(crate) event_listeners: EventListeners<ShutdownEvent>,
}

impl ShutdownConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ShutdownConfigBuilder {
        ShutdownConfigBuilder::new()
    }

    /// Time allowed for all handlers together.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the first failing handler stops the sequence.
    pub fn abort_on_error(&self) -> bool {
        self.abort_on_error
    }

    /// Whether the process exits once handlers finish.
    pub fn exit_on_complete(&self) -> bool {
        self.exit_on_complete
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ShutdownConfig`].
pub struct ShutdownConfigBuilder {
    name: String,
    timeout: Duration,
    abort_on_error: bool,
    exit_on_complete: bool,
    success_exit_code: i32,
    failure_exit_code: i32,
    force_exit_code: i32,
    event_listeners: EventListeners<ShutdownEvent>,
}

impl ShutdownConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: "shutdown".to_string(),
            timeout: Duration::from_secs(30),
            abort_on_error: false,
            exit_on_complete: true,
            success_exit_code: 0,
            failure_exit_code: 1,
            force_exit_code: 1,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name used in events and logs.
    ///
    /// Default: "shutdown"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the watchdog timeout for the whole handler sequence.
    ///
    /// Default: 30 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stops at the first failing handler instead of continuing.
    ///
    /// Default: false
    pub fn abort_on_error(mut self, abort: bool) -> Self {
        self.abort_on_error = abort;
        self
    }

    /// Whether to exit the process when the handlers are done.
    ///
    /// Set to false when the host runtime handles termination itself and only
    /// needs the [`ShutdownReport`](crate::ShutdownReport).
    ///
    /// Default: true
    pub fn exit_on_complete(mut self, exit: bool) -> Self {
        self.exit_on_complete = exit;
        self
    }

    /// Exit code when every handler succeeded.
    ///
    /// Default: 0
    pub fn success_exit_code(mut self, code: i32) -> Self {
        self.success_exit_code = code;
        self
    }

    /// Exit code when at least one handler failed.
    ///
    /// Default: 1
    pub fn failure_exit_code(mut self, code: i32) -> Self {
        self.failure_exit_code = code;
        self
    }

    /// Exit code when the watchdog fires.
    ///
    /// Default: 1
    pub fn force_exit_code(mut self, code: i32) -> Self {
        self.force_exit_code = code;
        self
    }

    /// Registers a callback when shutdown starts.
    pub fn on_started<F>(mut self, f: F) -> Self
    where
        F: Fn(&ShutdownTrigger) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &ShutdownEvent| {
            if let ShutdownEvent::Started { trigger, .. } = event {
                f(trigger);
            }
        }));
        self
    }

    /// Registers a callback for failed handlers.
    pub fn on_handler_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &ShutdownEvent| {
            if let ShutdownEvent::HandlerFailed {
                handler, message, ..
            } = event
            {
                f(handler, message);
            }
        }));
        self
    }

    /// Registers a callback for when the sequence ends, with the exit code.
    ///
    /// Called for both completion and watchdog timeout.
    pub fn on_finished<F>(mut self, f: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &ShutdownEvent| {
            match event {
                ShutdownEvent::Completed { exit_code, .. }
                | ShutdownEvent::TimedOut { exit_code, .. } => f(*exit_code),
                _ => {}
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ShutdownConfig {
        ShutdownConfig {
            name: self.name,
            timeout: self.timeout,
            abort_on_error: self.abort_on_error,
            exit_on_complete: self.exit_on_complete,
            success_exit_code: self.success_exit_code,
            failure_exit_code: self.failure_exit_code,
            force_exit_code: self.force_exit_code,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for ShutdownConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
