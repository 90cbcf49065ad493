//! Named bulkhead limits for the resource pools an application typically has.

use std::time::Duration;

/// Concurrency limits for one resource pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BulkheadPreset {
    /// Maximum number of operations running at once.
    pub max_concurrent: usize,
    /// Maximum number of callers waiting for a slot.
    pub max_queue: usize,
    /// How long a queued caller waits before giving up.
    pub wait_timeout: Duration,
}

impl BulkheadPreset {
    /// Slow, expensive model calls.
    pub const LLM: Self = Self::new(20, 50, Duration::from_secs(60));
    /// Database connections.
    pub const DATABASE: Self = Self::new(100, 500, Duration::from_secs(10));
    /// Outbound messaging providers.
    pub const MESSAGING: Self = Self::new(10, 100, Duration::from_secs(30));
    /// Inbound webhook processing.
    pub const WEBHOOK: Self = Self::new(50, 200, Duration::from_secs(5));
    /// Generic third-party HTTP APIs.
    pub const EXTERNAL_API: Self = Self::new(30, 100, Duration::from_secs(15));
    /// Used for any resource without a dedicated preset.
    pub const DEFAULT: Self = Self::new(10, 50, Duration::from_secs(30));

    /// Creates a preset from explicit limits.
    pub const fn new(max_concurrent: usize, max_queue: usize, wait_timeout: Duration) -> Self {
        Self {
            max_concurrent,
            max_queue,
            wait_timeout,
        }
    }

    /// Looks up the preset registered for a resource name.
    ///
    /// Names are matched case-insensitively, and `-` is treated like `_`.
    pub fn for_resource(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "llm" => Some(Self::LLM),
            "database" => Some(Self::DATABASE),
            "messaging" => Some(Self::MESSAGING),
            "webhook" => Some(Self::WEBHOOK),
            "external_api" => Some(Self::EXTERNAL_API),
            "default" => Some(Self::DEFAULT),
            _ => None,
        }
    }
}

impl Default for BulkheadPreset {
    fn default() -> Self {
        Self::DEFAULT
    }
}
