use super::ExitCodes;
use bulwark_shutdown::{ShutdownConfig, ShutdownCoordinator, ShutdownTrigger};
use std::io;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// A handler that hangs past the timeout forces an immediate exit; later
/// handlers never run.
#[tokio::test(start_paused = true)]
async fn hung_handler_forces_exit() {
    let codes = ExitCodes::default();
    let coordinator = ShutdownCoordinator::with_exit(
        ShutdownConfig::builder()
            .timeout(Duration::from_secs(1))
            .force_exit_code(2)
            .build(),
        codes.clone(),
    );
    coordinator.register("fast", 30, || async { Ok::<_, io::Error>(()) });
    coordinator.register("stuck", 20, || async {
        sleep(Duration::from_secs(60)).await;
        Ok::<_, io::Error>(())
    });
    coordinator.register("never", 10, || async { Ok::<_, io::Error>(()) });

    let start = Instant::now();
    let report = coordinator.shutdown(ShutdownTrigger::Manual).await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(1));
    assert!(report.timed_out);
    assert_eq!(report.exit_code, 2);
    assert_eq!(report.executed, vec!["fast".to_string()]);
    assert_eq!(report.skipped, vec!["stuck".to_string(), "never".to_string()]);
    assert_eq!(codes.recorded(), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn abort_on_error_skips_remaining() {
    let codes = ExitCodes::default();
    let coordinator = ShutdownCoordinator::with_exit(
        ShutdownConfig::builder().abort_on_error(true).build(),
        codes.clone(),
    );
    coordinator.register("first", 2, || async { Err::<(), _>("disk full") });
    coordinator.register("second", 1, || async { Ok::<_, io::Error>(()) });

    let report = coordinator.shutdown(ShutdownTrigger::Manual).await.unwrap();

    assert!(report.aborted);
    assert!(!report.timed_out);
    assert_eq!(report.skipped, vec!["second".to_string()]);
    assert_eq!(codes.recorded(), vec![1]);
}
