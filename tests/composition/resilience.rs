use bulwark::circuitbreaker::{CircuitBreakerThresholds, CircuitState};
use bulwark::ratelimiter::{InMemoryStore, RateLimitConfig, RateLimiter};
use bulwark::retry::RetryConfig;
use bulwark::shutdown::{ShutdownConfig, ShutdownCoordinator, ShutdownTrigger};
use bulwark::{Resilience, ResilienceError};
use std::io;
use std::time::Duration;

fn quick_retry() -> RetryConfig {
    RetryConfig::builder()
        .max_retries(1)
        .initial_delay(Duration::from_millis(10))
        .jitter(false)
        .build()
}

#[tokio::test(start_paused = true)]
async fn breakers_are_shared_by_name() {
    let resilience = Resilience::builder()
        .retry(quick_retry())
        .circuit_thresholds(CircuitBreakerThresholds {
            failure_threshold: 2,
            reset_timeout: Duration::from_secs(30),
            success_threshold: 1,
        })
        .build();

    for _ in 0..2 {
        let result = resilience
            .protect("whatsapp", || async { Err::<(), _>("503 service unavailable") })
            .await;
        assert!(result.unwrap_err().is_application());
    }

    let handle = resilience.clone();
    let result = handle.protect("whatsapp", || async { Ok::<_, &str>(()) }).await;
    assert!(result.unwrap_err().is_circuit_open());

    assert!(resilience.protect("gemini", || async { Ok::<_, &str>(1) }).await.is_ok());

    let snapshot = resilience.snapshot();
    assert_eq!(snapshot.circuits["whatsapp"].state, CircuitState::Open);
    assert_eq!(snapshot.circuits["gemini"].state, CircuitState::Closed);
    assert_eq!(snapshot.bulkheads["whatsapp"].failed, 4);
    assert!(!snapshot.shutting_down);
}

#[tokio::test]
async fn rate_checks_go_through_the_configured_limiter() {
    let open = Resilience::builder().build();
    let config = RateLimitConfig::new(1, Duration::from_secs(60));
    assert!(open.check_rate("anyone", &config).await.allowed);
    let unlimited = open.check_rate("anyone", &config).await;
    assert!(unlimited.allowed);
    let (_, reset) = &unlimited.headers()[2];
    assert!(reset.parse::<u64>().unwrap() > 1_700_000_000);

    let limited = Resilience::builder()
        .rate_limiter(RateLimiter::builder().store(InMemoryStore::new()).build())
        .build();
    assert!(limited.check_rate("client", &config).await.allowed);
    let denied = limited.check_rate("client", &config).await;
    assert!(!denied.allowed);
    assert!(denied.retry_after.is_some());
}

#[tokio::test]
async fn shutdown_refuses_new_work_and_tears_down() {
    let coordinator = ShutdownCoordinator::with_exit(
        ShutdownConfig::builder().exit_on_complete(false).build(),
        |_code: i32| {},
    );
    let resilience = Resilience::builder().shutdown(coordinator.clone(), 0).build();
    assert_eq!(coordinator.handlers(), vec![("resilience".to_string(), 0)]);

    resilience
        .protect("database", || async { Ok::<_, io::Error>(()) })
        .await
        .unwrap();
    assert_eq!(resilience.bulkheads().names(), vec!["database".to_string()]);

    let report = coordinator.shutdown(ShutdownTrigger::Manual).await.unwrap();
    assert_eq!(report.executed, vec!["resilience".to_string()]);
    assert!(resilience.is_shutting_down());
    assert!(resilience.bulkheads().names().is_empty());

    let refused = resilience
        .protect("database", || async { Ok::<_, io::Error>(()) })
        .await;
    assert!(matches!(refused, Err(ResilienceError::ShuttingDown)));
}
