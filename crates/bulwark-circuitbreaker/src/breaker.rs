use crate::circuit::{Circuit, CircuitMetrics, CircuitState};
use crate::classifier::{DefaultClassifier, FailureClassifier};
use crate::config::CircuitBreakerConfig;
use crate::error::CircuitBreakerError;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

struct Shared {
    config: CircuitBreakerConfig,
    circuit: Mutex<Circuit>,
}

/// Guards one logical downstream dependency.
///
/// `CircuitBreaker` is a cheap handle; clones share the same state. State only
/// changes while a call is admitted or recorded (and on [`reset`](Self::reset) /
/// [`force_open`](Self::force_open)), never on a background timer. Event
/// listeners run while the state lock is held and must not call back into the
/// breaker.
///
/// ```rust
/// use bulwark_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};
/// use std::time::Duration;
///
/// # async fn example() {
/// let breaker = CircuitBreaker::new(
///     CircuitBreakerConfig::builder()
///         .name("gemini")
///         .failure_threshold(3)
///         .reset_timeout(Duration::from_secs(30))
///         .success_threshold(2)
///         .build(),
/// );
///
/// match breaker.execute(|| async { Ok::<_, std::io::Error>("reply") }).await {
///     Ok(reply) => println!("{reply}"),
///     Err(CircuitBreakerError::OpenCircuit { .. }) => println!("serve cached answer"),
///     Err(CircuitBreakerError::Inner(e)) => println!("call failed: {e}"),
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

impl CircuitBreaker {
    /// Creates a closed circuit breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "circuitbreaker_calls_total",
                "Total number of calls through the circuit breaker, by outcome"
            );
            describe_counter!(
                "circuitbreaker_transitions_total",
                "Total number of circuit breaker state transitions"
            );
            describe_gauge!(
                "circuitbreaker_state",
                "Current state of the circuit breaker (0 closed, 1 open, 2 half-open)"
            );
        });

        Self {
            shared: Arc::new(Shared {
                config,
                circuit: Mutex::new(Circuit::new()),
            }),
        }
    }

    fn circuit(&self) -> MutexGuard<'_, Circuit> {
        self.shared
            .circuit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Name of the protected dependency.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// The configuration this breaker was built from.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.shared.config
    }

    /// Runs `op` if the circuit admits the call, recording every error as a failure.
    pub async fn execute<F, Fut, T, E>(&self, op: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_classified(&DefaultClassifier, op).await
    }

    /// Runs `op` if the circuit admits the call, letting `classifier` decide
    /// which errors count as failures.
    ///
    /// Returns [`CircuitBreakerError::OpenCircuit`] without invoking `op` when the
    /// circuit is open. Otherwise exactly one success or failure is recorded and
    /// the outcome of `op` is returned unchanged.
    pub async fn execute_classified<C, F, Fut, T, E>(
        &self,
        classifier: &C,
        op: F,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        C: FailureClassifier<E> + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.try_acquire() {
            return Err(CircuitBreakerError::OpenCircuit {
                name: self.shared.config.name.clone(),
            });
        }

        let result = op().await;

        match &result {
            Err(e) if classifier.is_failure(e) => self.record_failure(),
            _ => self.record_success(),
        }

        result.map_err(CircuitBreakerError::Inner)
    }

    /// Turns `f` into a function that runs every invocation through this breaker.
    pub fn wrap<A, F, Fut, T, E>(
        &self,
        f: F,
    ) -> impl Fn(A) -> BoxFuture<'static, Result<T, CircuitBreakerError<E>>> + Clone + Send + Sync
    where
        A: Send + 'static,
        F: Fn(A) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let breaker = self.clone();
        move |arg| {
            let breaker = breaker.clone();
            let f = f.clone();
            Box::pin(async move { breaker.execute(move || f(arg)).await })
        }
    }

    /// Returns whether a call may proceed right now.
    ///
    /// Moves an open circuit whose reset timeout has elapsed to half-open.
    pub fn is_available(&self) -> bool {
        self.circuit().is_available(&self.shared.config)
    }

    /// Admits or rejects one call, recording the decision.
    pub(crate) fn try_acquire(&self) -> bool {
        self.circuit().try_acquire(&self.shared.config)
    }

    pub(crate) fn record_success(&self) {
        self.circuit().record_success(&self.shared.config);
    }

    pub(crate) fn record_failure(&self) {
        self.circuit().record_failure(&self.shared.config);
    }

    /// Current state, without the lazy Open to HalfOpen check.
    pub fn state(&self) -> CircuitState {
        self.circuit().state()
    }

    /// Snapshot of counters and timings.
    pub fn metrics(&self) -> CircuitMetrics {
        self.circuit().metrics(&self.shared.config)
    }

    /// Closes the circuit and clears all counters.
    pub fn reset(&self) {
        self.circuit().reset(&self.shared.config);
    }

    /// Opens the circuit as if a failure had just happened.
    pub fn force_open(&self) {
        self.circuit().force_open(&self.shared.config);
    }

    /// Returns "healthy" when closed, "degraded" when half-open and
    /// "unhealthy" when open.
    pub fn health_status(&self) -> &'static str {
        match self.state() {
            CircuitState::Closed => "healthy",
            CircuitState::HalfOpen => "degraded",
            CircuitState::Open => "unhealthy",
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.shared.config.name)
            .field("state", &self.state())
            .finish()
    }
}
