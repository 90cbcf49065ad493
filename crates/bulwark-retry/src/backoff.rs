//! Delay computation between attempts.

use rand::Rng;
use std::time::Duration;

/// Exponential backoff capped at a maximum, with optional additive jitter.
///
/// The delay before retry `n` (starting at 1) is
/// `min(initial * multiplier^(n-1), max_delay)`. With jitter enabled a random
/// amount between zero and half of that base is added on top, so concurrent
/// callers that failed together do not retry in lockstep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    multiplier: f64,
    max_delay: Duration,
    jitter: bool,
}

impl ExponentialBackoff {
    /// Creates a backoff starting at `initial_delay` and doubling, capped at
    /// 30 seconds, with jitter.
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }

    /// Sets the growth factor between consecutive delays.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Caps the base delay.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Enables or disables jitter.
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// The delay before retry `retry` without jitter.
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(self.max_delay)
    }

    /// The delay to sleep before retry `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let extra = rand::rng().random_range(0.0..=base.as_secs_f64() * 0.5);
        base + Duration::from_secs_f64(extra)
    }
}
