use super::ExitCodes;
use bulwark_shutdown::{ShutdownConfig, ShutdownCoordinator, ShutdownTrigger};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Handlers at 100, 50 and 10; the one at 50 fails. All three run in priority
/// order and the process exits with 1.
#[tokio::test(start_paused = true)]
async fn failing_handler_does_not_stop_the_rest() {
    let codes = ExitCodes::default();
    let coordinator = ShutdownCoordinator::with_exit(
        ShutdownConfig::builder().timeout(Duration::from_secs(30)).build(),
        codes.clone(),
    );
    let ran = Arc::new(Mutex::new(Vec::new()));

    for (name, priority) in [("metrics", 10), ("queue", 50), ("http", 100)] {
        let ran = Arc::clone(&ran);
        coordinator.register(name, priority, move || async move {
            ran.lock().unwrap().push(name);
            if name == "queue" {
                return Err(io::Error::other("broker unreachable"));
            }
            Ok(())
        });
    }
    assert_eq!(
        coordinator.handlers(),
        vec![
            ("http".to_string(), 100),
            ("queue".to_string(), 50),
            ("metrics".to_string(), 10)
        ]
    );

    let report = coordinator
        .shutdown(ShutdownTrigger::Signal("SIGTERM".to_string()))
        .await
        .unwrap();

    assert_eq!(*ran.lock().unwrap(), vec!["http", "queue", "metrics"]);
    assert_eq!(report.executed, vec!["http".to_string(), "metrics".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "queue");
    assert_eq!(report.exit_code, 1);
    assert!(!report.is_clean());
    assert_eq!(codes.recorded(), vec![1]);

    let status = coordinator.status();
    assert!(status.is_shutting_down);
    assert_eq!(status.trigger, Some(ShutdownTrigger::Signal("SIGTERM".to_string())));
    assert_eq!(status.handlers_failed, vec!["queue".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn clean_run_exits_zero_once() {
    let codes = ExitCodes::default();
    let coordinator = ShutdownCoordinator::with_exit(ShutdownConfig::default(), codes.clone());
    coordinator.register("db", 0, || async { Ok::<_, io::Error>(()) });

    let report = coordinator.trigger_fatal("config file vanished").await.unwrap();
    assert!(report.is_clean());
    assert_eq!(report.trigger, ShutdownTrigger::Fatal("config file vanished".to_string()));
    assert!(report.trigger.is_fatal());

    assert!(coordinator.shutdown(ShutdownTrigger::Manual).await.is_none());
    assert_eq!(codes.recorded(), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn lifecycle_callbacks() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (s1, s2, s3) = (Arc::clone(&seen), Arc::clone(&seen), Arc::clone(&seen));
    let config = ShutdownConfig::builder()
        .exit_on_complete(false)
        .failure_exit_code(3)
        .on_started(move |trigger| s1.lock().unwrap().push(format!("started: {trigger}")))
        .on_handler_failed(move |name, message| {
            s2.lock().unwrap().push(format!("failed: {name}: {message}"))
        })
        .on_finished(move |code| s3.lock().unwrap().push(format!("finished: {code}")))
        .build();
    let codes = ExitCodes::default();
    let coordinator = ShutdownCoordinator::with_exit(config, codes.clone());
    coordinator.register("cache", 5, || async { Err::<(), _>("flush failed") });

    let report = coordinator.shutdown(ShutdownTrigger::Manual).await.unwrap();

    assert_eq!(report.exit_code, 3);
    assert!(codes.recorded().is_empty());
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen[0].starts_with("started"));
    assert_eq!(seen[1], "failed: cache: flush failed");
    assert_eq!(seen[2], "finished: 3");
}
