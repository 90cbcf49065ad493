use crate::classifier::{DefaultRetryClassifier, FnRetryClassifier, RetryClassifier};
use crate::config::RetryConfig;
use crate::events::RetryEvent;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What happened during one [`RetryExecutor::with_retry`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T, E> {
    /// The value of the successful attempt, or the error of the last one.
    pub result: Result<T, E>,
    /// Attempts made, including the first.
    pub attempts: u32,
    /// Time from the first attempt until the outcome was known.
    pub total_time: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    /// Returns `true` if an attempt succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Drops the bookkeeping and returns the result.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Runs operations with exponential backoff between failed attempts.
///
/// ```rust
/// use bulwark_retry::{RetryConfig, RetryExecutor};
/// use std::time::Duration;
///
/// # async fn example() {
/// let retry = RetryExecutor::new(
///     RetryConfig::builder()
///         .max_retries(3)
///         .initial_delay(Duration::from_millis(100))
///         .build(),
/// );
///
/// let outcome = retry
///     .with_retry(|| async { Err::<(), _>(std::io::Error::from(std::io::ErrorKind::ConnectionReset)) })
///     .await;
/// assert_eq!(outcome.attempts, 4);
/// # }
/// ```
pub struct RetryExecutor<C = DefaultRetryClassifier> {
    config: Arc<RetryConfig>,
    classifier: Arc<C>,
}

impl<C> Clone for RetryExecutor<C> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            classifier: Arc::clone(&self.classifier),
        }
    }
}

impl<C> std::fmt::Debug for RetryExecutor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RetryExecutor<DefaultRetryClassifier> {
    /// Creates an executor using the default transient-error classification.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config: Arc::new(config),
            classifier: Arc::new(DefaultRetryClassifier),
        }
    }
}

impl Default for RetryExecutor<DefaultRetryClassifier> {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl<C> RetryExecutor<C> {
    /// Replaces the classification with a closure returning `true` for retryable errors.
    pub fn retry_on<F>(self, f: F) -> RetryExecutor<FnRetryClassifier<F>> {
        RetryExecutor {
            config: self.config,
            classifier: Arc::new(FnRetryClassifier::new(f)),
        }
    }

    /// Replaces the classification.
    pub fn with_classifier<C2>(self, classifier: C2) -> RetryExecutor<C2> {
        RetryExecutor {
            config: self.config,
            classifier: Arc::new(classifier),
        }
    }

    /// The executor's configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// The executor's error classification.
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// `max_retries + 1` attempts have been made.
    ///
    /// Failures are reported in the returned [`RetryOutcome`] rather than as an
    /// error of their own.
    pub async fn with_retry<F, Fut, T, E>(&self, mut op: F) -> RetryOutcome<T, E>
    where
        C: RetryClassifier<E>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let config = &self.config;
        let start = tokio::time::Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let error = match op().await {
                Ok(value) => {
                    config.event_listeners.emit(&RetryEvent::Success {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts,
                    });

                    #[cfg(feature = "tracing")]
                    if attempts > 1 {
                        tracing::debug!(retry = %config.name, attempts, "succeeded after retrying");
                    }

                    return RetryOutcome {
                        result: Ok(value),
                        attempts,
                        total_time: start.elapsed(),
                    };
                }
                Err(error) => error,
            };

            if !self.classifier.is_retryable(&error) {
                config.event_listeners.emit(&RetryEvent::NonRetryable {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempts,
                });

                #[cfg(feature = "tracing")]
                tracing::debug!(retry = %config.name, attempts, "error is not retryable");

                return RetryOutcome {
                    result: Err(error),
                    attempts,
                    total_time: start.elapsed(),
                };
            }

            if attempts > config.max_retries {
                config.event_listeners.emit(&RetryEvent::Exhausted {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempts,
                });

                #[cfg(feature = "tracing")]
                tracing::warn!(retry = %config.name, attempts, "retries exhausted");

                return RetryOutcome {
                    result: Err(error),
                    attempts,
                    total_time: start.elapsed(),
                };
            }

            let delay = config.backoff.delay(attempts);
            config.event_listeners.emit(&RetryEvent::Retry {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                attempt: attempts,
                delay,
            });

            #[cfg(feature = "tracing")]
            tracing::debug!(retry = %config.name, attempt = attempts, ?delay, "retrying after transient error");

            drop(error);
            tokio::time::sleep(delay).await;
        }
    }

    /// Turns `f` into a function that retries every invocation.
    ///
    /// The argument is cloned for each attempt.
    pub fn wrap<A, F, Fut, T, E>(
        &self,
        f: F,
    ) -> impl Fn(A) -> BoxFuture<'static, RetryOutcome<T, E>> + Clone + Send + Sync
    where
        C: RetryClassifier<E> + 'static,
        A: Clone + Send + Sync + 'static,
        F: Fn(A) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let executor = self.clone();
        move |arg| {
            let executor = executor.clone();
            let f = f.clone();
            Box::pin(async move { executor.with_retry(|| f(arg.clone())).await })
        }
    }
}
