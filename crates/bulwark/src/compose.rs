//! Running one operation through breaker, retry and bulkhead together.

use bulwark_bulkhead::{Bulkhead, BulkheadError};
use bulwark_circuitbreaker::{CircuitBreaker, CircuitBreakerError, FnClassifier};
use bulwark_core::ResilienceError;
use bulwark_retry::{RetryClassifier, RetryExecutor};
use std::future::Future;

/// Retries what the wrapped executor would retry, but never a bulkhead rejection.
struct SkipRejections<C>(RetryExecutor<C>);

impl<C, E> RetryClassifier<BulkheadError<E>> for SkipRejections<C>
where
    C: RetryClassifier<E>,
{
    fn is_retryable(&self, error: &BulkheadError<E>) -> bool {
        match error {
            BulkheadError::Inner(e) => self.0.classifier().is_retryable(e),
            BulkheadError::Rejected { .. } => false,
        }
    }
}

/// Runs `op` as `breaker(retry(bulkhead(op)))`.
///
/// - The breaker sees the outcome of the whole retry series, so one failed
///   series is one failure. Bulkhead rejections do not count against it.
/// - Each attempt takes its own bulkhead slot, released before the backoff
///   sleep.
/// - Bulkhead rejections are never retried.
///
/// ```rust
/// use bulwark::bulkhead::{Bulkhead, BulkheadConfig};
/// use bulwark::circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};
/// use bulwark::retry::{RetryConfig, RetryExecutor};
/// use bulwark::protect;
///
/// # async fn example() {
/// let breaker = CircuitBreaker::new(CircuitBreakerConfig::builder().name("gemini").build());
/// let retry = RetryExecutor::new(RetryConfig::builder().name("gemini").build());
/// let bulkhead = Bulkhead::new(BulkheadConfig::builder().name("llm").build());
///
/// let answer = protect(&breaker, &retry, &bulkhead, || async {
///     Ok::<_, std::io::Error>("hello")
/// })
/// .await;
/// assert_eq!(answer.unwrap(), "hello");
/// # }
/// ```
pub async fn protect<C, F, Fut, T, E>(
    breaker: &CircuitBreaker,
    retry: &RetryExecutor<C>,
    bulkhead: &Bulkhead,
    mut op: F,
) -> Result<T, ResilienceError<E>>
where
    C: RetryClassifier<E>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let retry = &retry.clone().with_classifier(SkipRejections(retry.clone()));
    let counts_against_breaker = FnClassifier::new(|e: &BulkheadError<E>| !e.is_rejected());
    let op = &mut op;

    let result = breaker
        .execute_classified(&counts_against_breaker, move || async move {
            retry
                .with_retry(|| {
                    let attempt = op();
                    bulkhead.execute(move || attempt)
                })
                .await
                .into_result()
        })
        .await;

    match result {
        Ok(value) => Ok(value),
        Err(CircuitBreakerError::OpenCircuit { name }) => Err(ResilienceError::CircuitOpen { name }),
        Err(CircuitBreakerError::Inner(error)) => Err(error.into()),
    }
}
