//! Configuration for the bulkhead pattern.

use crate::events::BulkheadEvent;
use crate::presets::BulkheadPreset;
use bulwark_core::events::{EventListeners, FnListener};
use bulwark_core::RejectionReason;
use std::time::Duration;

/// Configuration for one bulkhead.
#[derive(Clone, Debug)]
pub struct BulkheadConfig {
    pub(crate) name: String,
    pub(crate) max_concurrent: usize,
    pub(crate) max_queue: usize,
    pub(crate) wait_timeout: Duration,
    pub(crate) event_listeners: EventListeners<BulkheadEvent>,
}

impl BulkheadConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BulkheadConfigBuilder {
        BulkheadConfigBuilder::new()
    }

    /// Creates a configuration for `name` from a preset, without listeners.
    pub fn from_preset(name: impl Into<String>, preset: BulkheadPreset) -> Self {
        Self::builder().name(name).preset(preset).build()
    }

    /// Resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum number of operations running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Maximum number of queued callers.
    pub fn max_queue(&self) -> usize {
        self.max_queue
    }

    /// How long a queued caller waits for a slot.
    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }
}

/// Builder for [`BulkheadConfig`].
pub struct BulkheadConfigBuilder {
    name: String,
    max_concurrent: usize,
    max_queue: usize,
    wait_timeout: Duration,
    event_listeners: EventListeners<BulkheadEvent>,
}

impl BulkheadConfigBuilder {
    /// Creates a new builder with the [`BulkheadPreset::DEFAULT`] limits.
    pub fn new() -> Self {
        let preset = BulkheadPreset::DEFAULT;
        Self {
            name: "bulkhead".to_string(),
            max_concurrent: preset.max_concurrent,
            max_queue: preset.max_queue,
            wait_timeout: preset.wait_timeout,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the resource name used in errors, events, logs and metric labels.
    ///
    /// Default: "bulkhead"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the maximum number of operations running at once.
    ///
    /// Values below 1 are raised to 1. Default: 10
    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Sets how many callers may wait for a slot. `0` disables queueing.
    ///
    /// Default: 50
    pub fn max_queue(mut self, max: usize) -> Self {
        self.max_queue = max;
        self
    }

    /// Sets how long a queued caller waits before being rejected with
    /// [`RejectionReason::Timeout`].
    ///
    /// Default: 30 seconds
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Copies all three limits from a preset.
    pub fn preset(mut self, preset: BulkheadPreset) -> Self {
        self.max_concurrent = preset.max_concurrent;
        self.max_queue = preset.max_queue;
        self.wait_timeout = preset.wait_timeout;
        self
    }

    /// Registers a callback invoked with the active call count when a call gets a slot.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallPermitted { active_calls, .. } = event {
                f(*active_calls);
            }
        }));
        self
    }

    /// Registers a callback invoked with the queue depth when a call starts waiting.
    pub fn on_call_queued<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallQueued { queue_depth, .. } = event {
                f(*queue_depth);
            }
        }));
        self
    }

    /// Registers a callback invoked when a call is refused.
    ///
    /// # Example
    /// ```rust
    /// use bulwark_bulkhead::BulkheadConfig;
    /// use bulwark_core::RejectionReason;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let timeouts = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&timeouts);
    ///
    /// let config = BulkheadConfig::builder()
    ///     .name("llm")
    ///     .on_call_rejected(move |reason| {
    ///         if reason == RejectionReason::Timeout {
    ///             counter.fetch_add(1, Ordering::SeqCst);
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(RejectionReason) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallRejected { reason, .. } = event {
                f(*reason);
            }
        }));
        self
    }

    /// Registers a callback invoked with the run time of each successful call.
    pub fn on_call_finished<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallFinished { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback invoked with the run time of each failed call.
    pub fn on_call_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallFailed { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> BulkheadConfig {
        BulkheadConfig {
            name: self.name,
            max_concurrent: self.max_concurrent.max(1),
            max_queue: self.max_queue,
            wait_timeout: self.wait_timeout,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for BulkheadConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
