use std::time::Duration;

/// The decision for one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// The configured limit.
    pub limit: u32,
    /// Admissions left in the current window.
    pub remaining: u32,
    /// When the window frees up again, in milliseconds since the Unix epoch.
    pub reset_at: u64,
    /// How long to wait before retrying, for rejected requests.
    pub retry_after: Option<Duration>,
}

impl RateLimitResult {
    pub(crate) fn allowed(limit: u32, remaining: u32, reset_at: u64) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            reset_at,
            retry_after: None,
        }
    }

    pub(crate) fn denied(limit: u32, reset_at: u64, now: u64) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            reset_at,
            retry_after: Some(Duration::from_millis(reset_at.saturating_sub(now))),
        }
    }

    /// Renders the standard rate limit response headers.
    ///
    /// `X-RateLimit-Reset` is in epoch seconds and `Retry-After` in whole
    /// seconds, both rounded up.
    ///
    /// ```rust
    /// use bulwark_ratelimiter::RateLimitResult;
    /// use std::time::Duration;
    ///
    /// let result = RateLimitResult {
    ///     allowed: false,
    ///     limit: 5,
    ///     remaining: 0,
    ///     reset_at: 1_700_000_060_500,
    ///     retry_after: Some(Duration::from_millis(1_500)),
    /// };
    /// assert_eq!(
    ///     result.headers(),
    ///     vec![
    ///         ("X-RateLimit-Limit", "5".to_string()),
    ///         ("X-RateLimit-Remaining", "0".to_string()),
    ///         ("X-RateLimit-Reset", "1700000061".to_string()),
    ///         ("Retry-After", "2".to_string()),
    ///     ]
    /// );
    /// ```
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
            ("X-RateLimit-Reset", self.reset_at.div_ceil(1_000).to_string()),
        ];
        if let Some(retry_after) = self.retry_after {
            let secs = crate::config::millis(retry_after).div_ceil(1_000).max(1);
            headers.push(("Retry-After", secs.to_string()));
        }
        headers
    }
}

/// Read-only view of an identifier's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitInfo {
    /// Admissions within the trailing window.
    pub count: u32,
    /// Whether the identifier is currently blocked.
    pub blocked: bool,
    /// End of the block, in milliseconds since the Unix epoch.
    pub blocked_until: Option<u64>,
}
