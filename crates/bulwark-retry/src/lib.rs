//! Retry with exponential backoff and jitter.
//!
//! [`RetryExecutor::with_retry`] runs an operation up to `max_retries + 1`
//! times. Between attempts it sleeps for an exponentially growing delay
//! (see [`ExponentialBackoff`]). Only errors the classifier considers transient
//! are retried; by default those are network failures, timeouts and
//! 429/502/503/504 responses ([`DefaultRetryClassifier`]).
//!
//! The result is a [`RetryOutcome`] carrying the final result together with the
//! number of attempts and the time spent, so callers can log or meter retries
//! without extra plumbing.
//!
//! ```rust
//! use bulwark_retry::{RetryConfig, RetryExecutor, RetryPolicy};
//!
//! # async fn example() {
//! let retry = RetryExecutor::new(RetryConfig::builder().name("gemini").policy(RetryPolicy::LLM).build())
//!     .retry_on(|status: &u16| matches!(status, 429 | 502 | 503 | 504));
//!
//! let outcome = retry.with_retry(|| async { Ok::<_, u16>("generated text") }).await;
//! println!("{} attempt(s) in {:?}", outcome.attempts, outcome.total_time);
//! let text = outcome.into_result();
//! # }
//! ```
//!
//! # Feature Flags
//! - `tracing`: retries and exhaustion logged via `tracing`
//! - `serde`: (de)serialize [`RetryPolicy`]

pub mod backoff;
pub mod classifier;
pub mod config;
pub mod events;
pub mod executor;

pub use backoff::ExponentialBackoff;
pub use classifier::{DefaultRetryClassifier, FnRetryClassifier, RetryClassifier};
pub use config::{RetryConfig, RetryConfigBuilder, RetryPolicy};
pub use events::RetryEvent;
pub use executor::{RetryExecutor, RetryOutcome};
