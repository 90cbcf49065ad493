use crate::backoff::ExponentialBackoff;
use crate::events::RetryEvent;
use bulwark_core::events::{EventListeners, FnListener};
use std::time::Duration;

/// The numeric part of a retry configuration.
///
/// The associated constants are the named presets. With the `serde` feature a
/// policy can be read from application configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound of the delay before jitter.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Whether to add random jitter.
    pub jitter: bool,
}

impl RetryPolicy {
    /// 3 retries from 1s, doubling up to 30s.
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(30),
        multiplier: 2.0,
        jitter: true,
    };

    /// 5 quick retries from 100ms, capped at 5s.
    pub const AGGRESSIVE: Self = Self {
        max_retries: 5,
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(5),
        multiplier: 2.0,
        jitter: true,
    };

    /// 2 slow retries from 2s, tripling up to 60s.
    pub const CONSERVATIVE: Self = Self {
        max_retries: 2,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(60),
        multiplier: 3.0,
        jitter: true,
    };

    /// Tuned for model providers that shed load with 429/503: 3 retries from 2s.
    pub const LLM: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(60),
        multiplier: 2.0,
        jitter: true,
    };

    /// Looks up a preset by name (`default`, `aggressive`, `conservative`, `llm`).
    pub fn named(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "default" => Some(Self::DEFAULT),
            "aggressive" => Some(Self::AGGRESSIVE),
            "conservative" => Some(Self::CONSERVATIVE),
            "llm" => Some(Self::LLM),
            _ => None,
        }
    }

    /// The backoff this policy produces.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.initial_delay)
            .multiplier(self.multiplier)
            .max_delay(self.max_delay)
            .jitter(self.jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Configuration for a [`RetryExecutor`](crate::RetryExecutor).
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub(crate) name: String,
    pub(crate) max_retries: u32,
    pub(crate) backoff: ExponentialBackoff,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
}

impl RetryConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Name used in events and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Retries after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The backoff between attempts.
    pub fn backoff(&self) -> &ExponentialBackoff {
        &self.backoff
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder {
    name: String,
    policy: RetryPolicy,
    event_listeners: EventListeners<RetryEvent>,
}

impl RetryConfigBuilder {
    /// Creates a new builder with [`RetryPolicy::DEFAULT`].
    pub fn new() -> Self {
        Self {
            name: "retry".to_string(),
            policy: RetryPolicy::DEFAULT,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name used in events and logs.
    ///
    /// Default: "retry"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces every numeric setting with a policy.
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets how many retries follow the first attempt. `0` disables retrying.
    ///
    /// Default: 3
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.policy.max_retries = max_retries;
        self
    }

    /// Sets the delay before the first retry.
    ///
    /// Default: 1 second
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.policy.initial_delay = delay;
        self
    }

    /// Caps the delay before jitter.
    ///
    /// Default: 30 seconds
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.policy.max_delay = delay;
        self
    }

    /// Sets the growth factor between consecutive delays.
    ///
    /// Default: 2.0
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.policy.multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    ///
    /// Default: enabled
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.policy.jitter = jitter;
        self
    }

    /// Registers a callback invoked with the retry number and delay before each retry.
    ///
    /// # Example
    /// ```rust
    /// use bulwark_retry::RetryConfig;
    ///
    /// let config = RetryConfig::builder()
    ///     .name("gemini")
    ///     .on_retry(|attempt, delay| eprintln!("gemini retry {attempt} in {delay:?}"))
    ///     .build();
    /// ```
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked with the attempt count when the operation succeeds.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked with the attempt count when every attempt failed.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when an error is not retryable.
    pub fn on_non_retryable<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::NonRetryable { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> RetryConfig {
        RetryConfig {
            name: self.name,
            max_retries: self.policy.max_retries,
            backoff: self.policy.backoff(),
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
