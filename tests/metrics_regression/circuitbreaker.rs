//! Circuit breaker metrics regression tests

use super::helpers::*;
use bulwark_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn circuitbreaker_call_and_transition_metrics() {
    init_recorder();

    let breaker = CircuitBreaker::new(
        CircuitBreakerConfig::builder()
            .name("metrics-breaker")
            .failure_threshold(1)
            .build(),
    );

    breaker.execute(|| async { Ok::<_, &str>(()) }).await.unwrap();
    let _ = breaker.execute(|| async { Err::<(), _>("down") }).await;
    let _ = breaker.execute(|| async { Ok::<_, &str>(()) }).await;

    assert_counter_exists("circuitbreaker_calls_total");
    assert_metric_has_label("circuitbreaker_calls_total", "circuitbreaker", "metrics-breaker");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "success");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "failure");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "rejected");

    assert_counter_exists("circuitbreaker_transitions_total");
    assert_metric_has_label("circuitbreaker_transitions_total", "from", "Closed");
    assert_metric_has_label("circuitbreaker_transitions_total", "to", "Open");

    assert_gauge_exists("circuitbreaker_state");
    assert_metric_has_label("circuitbreaker_state", "circuitbreaker", "metrics-breaker");
}
