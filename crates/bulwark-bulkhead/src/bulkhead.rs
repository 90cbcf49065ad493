//! The bulkhead itself: slot accounting, the FIFO wait queue and statistics.

use crate::config::BulkheadConfig;
use crate::error::BulkheadError;
use crate::events::BulkheadEvent;
use bulwark_core::RejectionReason;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::oneshot;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

#[cfg(feature = "metrics")]
fn describe_metrics() {
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "bulkhead_calls_permitted_total",
            "Total number of calls that acquired a bulkhead slot"
        );
        describe_counter!(
            "bulkhead_calls_rejected_total",
            "Total number of calls rejected by the bulkhead, by reason"
        );
        describe_counter!(
            "bulkhead_calls_finished_total",
            "Total number of calls that finished successfully"
        );
        describe_counter!(
            "bulkhead_calls_failed_total",
            "Total number of calls that returned an error"
        );
        describe_gauge!("bulkhead_active_calls", "Current number of running calls");
        describe_gauge!("bulkhead_queued_calls", "Current number of waiting calls");
    });
}

/// Point-in-time statistics of a bulkhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkheadStats {
    /// Calls that ran and succeeded.
    pub completed: u64,
    /// Calls refused because slots and queue were full.
    pub rejected: u64,
    /// Calls refused because they waited longer than the wait timeout.
    pub timed_out: u64,
    /// Calls that ran and returned an error.
    pub failed: u64,
    /// Calls currently holding a slot.
    pub active: usize,
    /// Calls currently waiting for a slot.
    pub queued: usize,
    /// Configured slot count.
    pub max_concurrent: usize,
    /// Configured queue capacity.
    pub max_queue: usize,
}

impl BulkheadStats {
    /// Fraction of slots in use, between 0.0 and 1.0.
    pub fn utilization(&self) -> f64 {
        if self.max_concurrent == 0 {
            return 0.0;
        }
        self.active as f64 / self.max_concurrent as f64
    }

    /// Returns `true` if every slot is taken.
    pub fn is_saturated(&self) -> bool {
        self.active >= self.max_concurrent
    }

    /// Returns `true` if the next caller that finds no free slot would be rejected.
    pub fn is_queue_full(&self) -> bool {
        self.queued >= self.max_queue
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    completed: u64,
    rejected: u64,
    timed_out: u64,
    failed: u64,
}

struct Waiter {
    id: u64,
    grant: oneshot::Sender<()>,
}

struct State {
    active: usize,
    waiters: VecDeque<Waiter>,
    next_waiter_id: u64,
    counters: Counters,
}

impl State {
    /// Frees one slot, handing it straight to the oldest live waiter if any.
    ///
    /// Runs under the bulkhead mutex so two releases never grant the same slot.
    fn release_slot(&mut self) {
        while let Some(waiter) = self.waiters.pop_front() {
            if waiter.grant.send(()).is_ok() {
                return;
            }
        }
        self.active = self.active.saturating_sub(1);
    }

    fn position_of(&self, id: u64) -> Option<usize> {
        self.waiters.iter().position(|w| w.id == id)
    }
}

struct Shared {
    config: BulkheadConfig,
    state: Mutex<State>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: BulkheadEvent) {
        if !self.config.event_listeners.is_empty() {
            self.config.event_listeners.emit(&event);
        }
    }

    #[cfg(feature = "metrics")]
    fn record_gauges(&self, active: usize, queued: usize) {
        gauge!("bulkhead_active_calls", "bulkhead" => self.config.name.clone()).set(active as f64);
        gauge!("bulkhead_queued_calls", "bulkhead" => self.config.name.clone()).set(queued as f64);
    }

    fn release(&self) {
        let (_active, _queued) = {
            let mut state = self.lock();
            state.release_slot();
            (state.active, state.waiters.len())
        };

        #[cfg(feature = "metrics")]
        self.record_gauges(_active, _queued);
    }
}

/// A held slot. Dropping it frees the slot.
struct Permit {
    shared: Arc<Shared>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.shared.release();
    }
}

/// A caller sitting in the wait queue.
///
/// Dropping it before it has been settled (the caller's future was cancelled)
/// takes it out of the queue, or gives back the slot it was handed meanwhile.
struct QueuedWaiter {
    shared: Arc<Shared>,
    id: u64,
    grant: oneshot::Receiver<()>,
    settled: bool,
}

impl QueuedWaiter {
    /// Leaves the queue. Returns `true` if a slot was handed over before we
    /// got the lock, in which case the caller now owns it.
    fn withdraw(&mut self) -> bool {
        self.settled = true;
        let mut state = self.shared.lock();
        if let Some(pos) = state.position_of(self.id) {
            state.waiters.remove(pos);
            return false;
        }
        self.grant.try_recv().is_ok()
    }
}

impl Drop for QueuedWaiter {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.shared.lock();
        if let Some(pos) = state.position_of(self.id) {
            state.waiters.remove(pos);
        } else if self.grant.try_recv().is_ok() {
            state.release_slot();
        }
    }
}

/// A named concurrency limiter with a bounded FIFO wait queue.
///
/// `Bulkhead` is a cheap handle; clones share the same slots, queue and statistics.
///
/// ```rust
/// use bulwark_bulkhead::{Bulkhead, BulkheadConfig};
/// use std::time::Duration;
///
/// # async fn example() {
/// let bulkhead = Bulkhead::new(
///     BulkheadConfig::builder()
///         .name("llm")
///         .max_concurrent(2)
///         .max_queue(10)
///         .wait_timeout(Duration::from_secs(5))
///         .build(),
/// );
///
/// let answer = bulkhead
///     .execute(|| async { Ok::<_, std::io::Error>(42) })
///     .await;
/// assert_eq!(answer.unwrap(), 42);
/// # }
/// ```
#[derive(Clone)]
pub struct Bulkhead {
    shared: Arc<Shared>,
}

impl Bulkhead {
    /// Creates a bulkhead from its configuration.
    pub fn new(config: BulkheadConfig) -> Self {
        #[cfg(feature = "metrics")]
        describe_metrics();

        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(State {
                    active: 0,
                    waiters: VecDeque::new(),
                    next_waiter_id: 0,
                    counters: Counters::default(),
                }),
            }),
        }
    }

    /// Resource name.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// The configuration this bulkhead was built from.
    pub fn config(&self) -> &BulkheadConfig {
        &self.shared.config
    }

    /// Runs `op` once a slot is held.
    ///
    /// Waits in FIFO order if every slot is busy. Fails with
    /// [`BulkheadError::Rejected`] without calling `op` when the queue is full or
    /// the wait timeout expires. The slot is always released, also when the
    /// returned future is dropped part-way.
    pub async fn execute<F, Fut, T, E>(&self, op: F) -> Result<T, BulkheadError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.acquire().await.map_err(|reason| self.rejection(reason))?;
        self.run(permit, op).await
    }

    /// Runs `op` only if a slot is free right now. Never queues.
    pub async fn try_execute<F, Fut, T, E>(&self, op: F) -> Result<T, BulkheadError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self
            .try_acquire()
            .ok_or_else(|| self.rejection(RejectionReason::Full))?;
        self.run(permit, op).await
    }

    /// Turns `f` into a function that runs every invocation inside this bulkhead.
    ///
    /// ```rust
    /// use bulwark_bulkhead::{Bulkhead, BulkheadConfig};
    ///
    /// # async fn example() {
    /// let bulkhead = Bulkhead::new(BulkheadConfig::builder().name("database").build());
    /// let lookup = bulkhead.wrap(|id: u64| async move { Ok::<_, String>(id * 2) });
    ///
    /// assert_eq!(lookup(21).await.unwrap(), 42);
    /// # }
    /// ```
    pub fn wrap<A, F, Fut, T, E>(
        &self,
        f: F,
    ) -> impl Fn(A) -> BoxFuture<'static, Result<T, BulkheadError<E>>> + Clone + Send + Sync
    where
        A: Send + 'static,
        F: Fn(A) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let bulkhead = self.clone();
        move |arg| {
            let bulkhead = bulkhead.clone();
            let f = f.clone();
            Box::pin(async move { bulkhead.execute(move || f(arg)).await })
        }
    }

    /// Current statistics.
    pub fn stats(&self) -> BulkheadStats {
        let state = self.shared.lock();
        BulkheadStats {
            completed: state.counters.completed,
            rejected: state.counters.rejected,
            timed_out: state.counters.timed_out,
            failed: state.counters.failed,
            active: state.active,
            queued: state.waiters.len(),
            max_concurrent: self.shared.config.max_concurrent,
            max_queue: self.shared.config.max_queue,
        }
    }

    /// Zeroes the counters. Active and queued calls are untouched.
    pub fn reset_stats(&self) {
        self.shared.lock().counters = Counters::default();
    }

    /// Fraction of slots in use.
    pub fn utilization(&self) -> f64 {
        self.stats().utilization()
    }

    /// Returns `true` if every slot is taken.
    pub fn is_saturated(&self) -> bool {
        self.stats().is_saturated()
    }

    /// Returns `true` if the wait queue is at capacity.
    pub fn is_queue_full(&self) -> bool {
        self.stats().is_queue_full()
    }

    fn rejection<E>(&self, reason: RejectionReason) -> BulkheadError<E> {
        BulkheadError::Rejected {
            name: self.shared.config.name.clone(),
            reason,
        }
    }

    fn try_acquire(&self) -> Option<Permit> {
        let admitted = {
            let mut state = self.shared.lock();
            if state.active < self.shared.config.max_concurrent {
                state.active += 1;
                Some(state.active)
            } else {
                state.counters.rejected += 1;
                None
            }
        };

        match admitted {
            Some(active) => {
                self.on_permitted(active);
                Some(self.permit())
            }
            None => {
                self.on_rejected(RejectionReason::Full);
                None
            }
        }
    }

    async fn acquire(&self) -> Result<Permit, RejectionReason> {
        let config = &self.shared.config;

        let queued = {
            let mut state = self.shared.lock();
            if state.active < config.max_concurrent {
                state.active += 1;
                Ok(state.active)
            } else if state.waiters.len() >= config.max_queue {
                state.counters.rejected += 1;
                Err(None)
            } else {
                let id = state.next_waiter_id;
                state.next_waiter_id += 1;
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(Waiter { id, grant: tx });
                Err(Some((id, rx, state.waiters.len())))
            }
        };

        let (id, rx, queue_depth) = match queued {
            Ok(active) => {
                self.on_permitted(active);
                return Ok(self.permit());
            }
            Err(None) => {
                self.on_rejected(RejectionReason::Full);
                return Err(RejectionReason::Full);
            }
            Err(Some(waiting)) => waiting,
        };

        self.on_queued(queue_depth);

        let mut waiter = QueuedWaiter {
            shared: Arc::clone(&self.shared),
            id,
            grant: rx,
            settled: false,
        };

        let waited = tokio::time::timeout(config.wait_timeout, &mut waiter.grant).await;
        let granted = match waited {
            Ok(Ok(())) => {
                waiter.settled = true;
                true
            }
            // Deadline fired, or the grant vanished. A hand-off that raced the
            // deadline still counts as granted.
            Ok(Err(_)) | Err(_) => waiter.withdraw(),
        };

        if granted {
            let active = self.shared.lock().active;
            self.on_permitted(active);
            Ok(self.permit())
        } else {
            self.shared.lock().counters.timed_out += 1;
            self.on_rejected(RejectionReason::Timeout);
            Err(RejectionReason::Timeout)
        }
    }

    fn permit(&self) -> Permit {
        Permit {
            shared: Arc::clone(&self.shared),
        }
    }

    async fn run<F, Fut, T, E>(&self, permit: Permit, op: F) -> Result<T, BulkheadError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let start = tokio::time::Instant::now();
        let result = op().await;
        let duration = start.elapsed();

        {
            let mut state = self.shared.lock();
            match &result {
                Ok(_) => state.counters.completed += 1,
                Err(_) => state.counters.failed += 1,
            }
        }
        drop(permit);

        let name = self.shared.config.name.clone();
        match &result {
            Ok(_) => {
                self.shared.emit(BulkheadEvent::CallFinished {
                    pattern_name: name,
                    timestamp: Instant::now(),
                    duration,
                });

                #[cfg(feature = "metrics")]
                counter!("bulkhead_calls_finished_total", "bulkhead" => self.shared.config.name.clone())
                    .increment(1);
            }
            Err(_) => {
                self.shared.emit(BulkheadEvent::CallFailed {
                    pattern_name: name,
                    timestamp: Instant::now(),
                    duration,
                });

                #[cfg(feature = "metrics")]
                counter!("bulkhead_calls_failed_total", "bulkhead" => self.shared.config.name.clone())
                    .increment(1);
            }
        }

        result.map_err(BulkheadError::Inner)
    }

    fn on_permitted(&self, active: usize) {
        self.shared.emit(BulkheadEvent::CallPermitted {
            pattern_name: self.shared.config.name.clone(),
            timestamp: Instant::now(),
            active_calls: active,
        });

        #[cfg(feature = "metrics")]
        {
            counter!("bulkhead_calls_permitted_total", "bulkhead" => self.shared.config.name.clone())
                .increment(1);
            let queued = self.shared.lock().waiters.len();
            self.shared.record_gauges(active, queued);
        }
    }

    fn on_queued(&self, queue_depth: usize) {
        #[cfg(feature = "tracing")]
        tracing::debug!(bulkhead = %self.shared.config.name, queue_depth, "all slots busy, waiting");

        self.shared.emit(BulkheadEvent::CallQueued {
            pattern_name: self.shared.config.name.clone(),
            timestamp: Instant::now(),
            queue_depth,
        });

        #[cfg(feature = "metrics")]
        gauge!("bulkhead_queued_calls", "bulkhead" => self.shared.config.name.clone())
            .set(queue_depth as f64);
    }

    fn on_rejected(&self, reason: RejectionReason) {
        #[cfg(feature = "tracing")]
        tracing::warn!(bulkhead = %self.shared.config.name, reason = reason.as_str(), "call rejected");

        self.shared.emit(BulkheadEvent::CallRejected {
            pattern_name: self.shared.config.name.clone(),
            timestamp: Instant::now(),
            reason,
        });

        #[cfg(feature = "metrics")]
        counter!(
            "bulkhead_calls_rejected_total",
            "bulkhead" => self.shared.config.name.clone(),
            "reason" => reason.as_str()
        )
        .increment(1);
    }
}

impl std::fmt::Debug for Bulkhead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bulkhead")
            .field("name", &self.shared.config.name)
            .field("stats", &self.stats())
            .finish()
    }
}
