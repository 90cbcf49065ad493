use bulwark_bulkhead::{Bulkhead, BulkheadConfig, BulkheadError, RejectionReason};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

fn bulkhead(max_concurrent: usize, max_queue: usize, wait_timeout: Duration) -> Bulkhead {
    Bulkhead::new(
        BulkheadConfig::builder()
            .name("test")
            .max_concurrent(max_concurrent)
            .max_queue(max_queue)
            .wait_timeout(wait_timeout)
            .build(),
    )
}

/// Two slots, one queue place: the third caller waits, the fourth is turned away.
#[tokio::test(start_paused = true)]
async fn overflow_queues_then_rejects() {
    let bulkhead = bulkhead(2, 1, Duration::from_millis(1000));
    let started = Instant::now();

    let mut handles = Vec::new();
    for i in 0..3 {
        let bh = bulkhead.clone();
        handles.push(tokio::spawn(async move {
            bh.execute(|| async move {
                sleep(Duration::from_millis(500)).await;
                Ok::<_, String>((i, Instant::now()))
            })
            .await
        }));
        tokio::task::yield_now().await;
    }

    let stats = bulkhead.stats();
    assert_eq!(stats.active, 2);
    assert_eq!(stats.queued, 1);

    let called = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&called);
    let fourth = bulkhead
        .execute(|| async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(())
        })
        .await;
    assert!(matches!(
        fourth,
        Err(BulkheadError::Rejected {
            reason: RejectionReason::Full,
            ..
        })
    ));
    assert_eq!(called.load(Ordering::SeqCst), 0);

    let mut finished = Vec::new();
    for handle in handles {
        finished.push(handle.await.unwrap().unwrap());
    }

    // The queued call only started once a slot was freed at 500ms.
    let (_, third_done) = finished[2];
    assert_eq!(third_done - started, Duration::from_millis(1000));

    let stats = bulkhead.stats();
    assert_eq!(stats.completed, 3);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.active, 0);
    assert_eq!(stats.queued, 0);
}

/// Many callers, few slots: the running count never goes above the limit.
#[tokio::test(start_paused = true)]
async fn hundred_callers_never_exceed_limit() {
    let max_concurrent = 10;
    let bulkhead = bulkhead(max_concurrent, 100, Duration::from_secs(60));
    let current = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..100 {
        let bh = bulkhead.clone();
        let current = Arc::clone(&current);
        let max_seen = Arc::clone(&max_seen);
        handles.push(tokio::spawn(async move {
            bh.execute(|| async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(10)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(())
            })
            .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(max_seen.load(Ordering::SeqCst) <= max_concurrent);
    assert_eq!(bulkhead.stats().completed, 100);
}

/// A failing operation still gives its slot back.
#[tokio::test]
async fn failure_releases_slot() {
    let bulkhead = bulkhead(1, 0, Duration::from_secs(1));

    let result = bulkhead.execute(|| async { Err::<(), _>("boom") }).await;
    assert!(matches!(result, Err(BulkheadError::Inner("boom"))));

    let result = bulkhead.execute(|| async { Ok::<_, &str>(1) }).await;
    assert_eq!(result.unwrap(), 1);

    let stats = bulkhead.stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.active, 0);
}

#[tokio::test(start_paused = true)]
async fn try_execute_never_waits() {
    let bulkhead = bulkhead(1, 10, Duration::from_secs(10));

    let bh = bulkhead.clone();
    let busy = tokio::spawn(async move {
        bh.execute(|| async {
            sleep(Duration::from_secs(1)).await;
            Ok::<_, String>(())
        })
        .await
    });
    tokio::task::yield_now().await;

    let result = bulkhead.try_execute(|| async { Ok::<_, String>(()) }).await;
    assert_eq!(result.unwrap_err().rejection_reason(), Some(RejectionReason::Full));
    assert_eq!(bulkhead.stats().queued, 0);

    busy.await.unwrap().unwrap();
    assert!(bulkhead.try_execute(|| async { Ok::<_, String>(()) }).await.is_ok());
}

#[tokio::test]
async fn wrapped_function_shares_slots() {
    let bulkhead = bulkhead(2, 0, Duration::from_secs(1));
    let double = bulkhead.wrap(|n: u32| async move { Ok::<_, String>(n * 2) });

    assert_eq!(double(4).await.unwrap(), 8);
    assert_eq!(double(5).await.unwrap(), 10);
    assert_eq!(bulkhead.stats().completed, 2);
}
