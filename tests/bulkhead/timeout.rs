use bulwark_bulkhead::{Bulkhead, BulkheadConfig, BulkheadError, RejectionReason};
use std::time::Duration;
use tokio::time::{sleep, Instant};

fn single_slot(wait_timeout: Duration) -> Bulkhead {
    Bulkhead::new(
        BulkheadConfig::builder()
            .name("slow-api")
            .max_concurrent(1)
            .max_queue(5)
            .wait_timeout(wait_timeout)
            .build(),
    )
}

fn occupy(bulkhead: &Bulkhead, hold: Duration) -> tokio::task::JoinHandle<Result<(), BulkheadError<String>>> {
    let bh = bulkhead.clone();
    tokio::spawn(async move {
        bh.execute(|| async move {
            sleep(hold).await;
            Ok(())
        })
        .await
    })
}

#[tokio::test(start_paused = true)]
async fn queued_caller_times_out() {
    let bulkhead = single_slot(Duration::from_millis(100));
    let holder = occupy(&bulkhead, Duration::from_secs(1));
    tokio::task::yield_now().await;

    let start = Instant::now();
    let result = bulkhead.execute(|| async { Ok::<_, String>(()) }).await;

    assert_eq!(start.elapsed(), Duration::from_millis(100));
    assert_eq!(
        result.unwrap_err().rejection_reason(),
        Some(RejectionReason::Timeout)
    );

    let stats = bulkhead.stats();
    assert_eq!(stats.timed_out, 1);
    assert_eq!(stats.queued, 0);

    holder.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn waiter_admitted_before_deadline() {
    let bulkhead = single_slot(Duration::from_millis(500));
    let holder = occupy(&bulkhead, Duration::from_millis(200));
    tokio::task::yield_now().await;

    let start = Instant::now();
    let result = bulkhead.execute(|| async { Ok::<_, String>("late") }).await;

    assert_eq!(result.unwrap(), "late");
    assert_eq!(start.elapsed(), Duration::from_millis(200));
    holder.await.unwrap().unwrap();
}

/// A caller cancelled while queued leaves the queue without leaking a slot.
#[tokio::test(start_paused = true)]
async fn cancelled_waiter_leaves_queue() {
    let bulkhead = single_slot(Duration::from_secs(10));
    let holder = occupy(&bulkhead, Duration::from_millis(100));
    tokio::task::yield_now().await;

    let bh = bulkhead.clone();
    let waiter = tokio::spawn(async move { bh.execute(|| async { Ok::<_, String>(()) }).await });
    tokio::task::yield_now().await;
    assert_eq!(bulkhead.stats().queued, 1);

    waiter.abort();
    let _ = waiter.await;
    assert_eq!(bulkhead.stats().queued, 0);

    holder.await.unwrap().unwrap();
    assert_eq!(bulkhead.stats().active, 0);
    assert!(bulkhead.try_execute(|| async { Ok::<_, String>(()) }).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn waiters_are_served_in_arrival_order() {
    let bulkhead = single_slot(Duration::from_secs(10));
    let holder = occupy(&bulkhead, Duration::from_millis(50));
    tokio::task::yield_now().await;

    let order = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut handles = Vec::new();
    for i in 0..4 {
        let bh = bulkhead.clone();
        let order = std::sync::Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            bh.execute(|| async move {
                order.lock().unwrap().push(i);
                sleep(Duration::from_millis(10)).await;
                Ok::<_, String>(())
            })
            .await
        }));
        tokio::task::yield_now().await;
    }

    holder.await.unwrap().unwrap();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
}
