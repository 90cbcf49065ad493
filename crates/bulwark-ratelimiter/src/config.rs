//! Rate limit rules and the named presets used by route category.

use std::time::Duration;

/// How many requests an identifier may make per trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateLimitConfig {
    /// Admissions allowed per window.
    pub limit: u32,
    /// Length of the trailing window.
    pub window: Duration,
    /// If set, exceeding the limit blocks the identifier for this long.
    #[cfg_attr(feature = "serde", serde(default))]
    pub block_duration: Option<Duration>,
}

impl RateLimitConfig {
    /// General API traffic: 100 per minute.
    pub const STANDARD: Self = Self::new(100, Duration::from_secs(60));
    /// Sensitive endpoints: 10 per minute, 5 minute block.
    pub const STRICT: Self =
        Self::new(10, Duration::from_secs(60)).with_block(Duration::from_secs(300));
    /// Login and password reset: 5 per 15 minutes, 15 minute block.
    pub const AUTH: Self =
        Self::new(5, Duration::from_secs(900)).with_block(Duration::from_secs(900));
    /// Inbound webhooks: 1000 per minute.
    pub const WEBHOOK: Self = Self::new(1_000, Duration::from_secs(60));
    /// AI chat and generation: 20 per minute.
    pub const AI: Self = Self::new(20, Duration::from_secs(60));
    /// File uploads: 10 per hour.
    pub const UPLOAD: Self = Self::new(10, Duration::from_secs(3_600));
    /// Per API key: 1000 per hour.
    pub const API_KEY: Self = Self::new(1_000, Duration::from_secs(3_600));

    /// Creates a rule without blocking.
    pub const fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            block_duration: None,
        }
    }

    /// Blocks identifiers that exceed the limit for `block`.
    pub const fn with_block(mut self, block: Duration) -> Self {
        self.block_duration = Some(block);
        self
    }

    /// Looks up a preset by route category.
    pub fn named(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "standard" => Some(Self::STANDARD),
            "strict" => Some(Self::STRICT),
            "auth" => Some(Self::AUTH),
            "webhook" => Some(Self::WEBHOOK),
            "ai" => Some(Self::AI),
            "upload" => Some(Self::UPLOAD),
            "api_key" => Some(Self::API_KEY),
            _ => None,
        }
    }

    pub(crate) fn window_millis(&self) -> u64 {
        millis(self.window)
    }

    pub(crate) fn block_millis(&self) -> u64 {
        self.block_duration.map(millis).unwrap_or(0)
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
