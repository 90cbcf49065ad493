use bulwark::bulkhead::{Bulkhead, BulkheadConfig};
use bulwark::circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use bulwark::retry::{RetryConfig, RetryExecutor};
use bulwark::{protect, ResilienceError};
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::sleep;

fn retry() -> RetryExecutor {
    RetryExecutor::new(
        RetryConfig::builder()
            .max_retries(2)
            .initial_delay(Duration::from_millis(100))
            .jitter(false)
            .build(),
    )
}

/// A flaky LLM call: two timeouts, then an answer. The caller sees only the
/// answer and the breaker records a single success.
#[tokio::test(start_paused = true)]
async fn flaky_call_recovers_within_one_breaker_call() {
    let breaker = CircuitBreaker::new(CircuitBreakerConfig::builder().name("gemini").build());
    let bulkhead = Bulkhead::new(BulkheadConfig::builder().name("llm").max_concurrent(1).build());
    let calls = AtomicU32::new(0);

    let answer = protect(&breaker, &retry(), &bulkhead, || async {
        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(io::Error::from(io::ErrorKind::TimedOut))
        } else {
            Ok("generated text")
        }
    })
    .await;

    assert_eq!(answer.unwrap(), "generated text");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let metrics = breaker.metrics();
    assert_eq!(metrics.total_successes, 1);
    assert_eq!(metrics.total_failures, 0);

    let stats = bulkhead.stats();
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.active, 0);
}

#[tokio::test(start_paused = true)]
async fn permanent_errors_are_not_retried() {
    let breaker = CircuitBreaker::new(CircuitBreakerConfig::builder().name("crm").build());
    let bulkhead = Bulkhead::new(BulkheadConfig::builder().name("crm").build());
    let calls = AtomicU32::new(0);

    let result = protect(&breaker, &retry(), &bulkhead, || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(io::Error::from(io::ErrorKind::PermissionDenied))
    })
    .await;

    assert!(result.unwrap_err().is_application());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(breaker.metrics().total_failures, 1);
}

/// A saturated bulkhead rejects without retrying and without tripping the breaker.
#[tokio::test(start_paused = true)]
async fn saturation_is_not_a_dependency_failure() {
    let breaker = CircuitBreaker::new(
        CircuitBreakerConfig::builder()
            .name("database")
            .failure_threshold(1)
            .build(),
    );
    let bulkhead = Bulkhead::new(
        BulkheadConfig::builder()
            .name("database")
            .max_concurrent(1)
            .max_queue(0)
            .build(),
    );

    let bh = bulkhead.clone();
    let busy = tokio::spawn(async move {
        bh.execute(|| async {
            sleep(Duration::from_secs(1)).await;
            Ok::<_, io::Error>(())
        })
        .await
    });
    tokio::task::yield_now().await;

    let calls = AtomicU32::new(0);
    let result = protect(&breaker, &retry(), &bulkhead, || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, io::Error>(())
    })
    .await;

    assert!(result.unwrap_err().is_bulkhead_rejected());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(bulkhead.stats().rejected, 1);
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.metrics().total_failures, 0);

    busy.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn open_breaker_short_circuits() {
    let breaker = CircuitBreaker::new(CircuitBreakerConfig::builder().name("n8n").build());
    let bulkhead = Bulkhead::new(BulkheadConfig::builder().name("n8n").build());
    breaker.force_open();

    let calls = AtomicU32::new(0);
    let result = protect(&breaker, &retry(), &bulkhead, || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, io::Error>(())
    })
    .await;

    assert!(matches!(result, Err(ResilienceError::CircuitOpen { ref name }) if name == "n8n"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(bulkhead.stats().completed, 0);
}
