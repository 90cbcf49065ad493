use crate::config::ShutdownConfig;
use crate::error::{BoxError, HandlerFailure};
use crate::events::ShutdownEvent;
use crate::exit::{Exit, ProcessExit};
use crate::trigger::ShutdownTrigger;
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::Instrument;

type HandlerFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>;

struct Registered {
    name: String,
    priority: i32,
    run: HandlerFn,
}

#[derive(Default)]
struct State {
    handlers: Vec<Registered>,
    shutting_down: bool,
    trigger: Option<ShutdownTrigger>,
    started_at: Option<Instant>,
    executed: Vec<String>,
    failed: Vec<HandlerFailure>,
}

struct Shared {
    config: ShutdownConfig,
    exit: Box<dyn Exit>,
    state: Mutex<State>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ShutdownEvent) {
        self.config.event_listeners.emit(&event);
    }
}

/// Snapshot of the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShutdownStatus {
    /// Whether a shutdown has started.
    pub is_shutting_down: bool,
    /// What started it.
    pub trigger: Option<ShutdownTrigger>,
    /// When it started.
    pub started_at: Option<Instant>,
    /// Handlers that completed, in execution order.
    pub handlers_executed: Vec<String>,
    /// Handlers that failed, in execution order.
    pub handlers_failed: Vec<String>,
}

/// Summary of a finished shutdown sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// What started the shutdown.
    pub trigger: ShutdownTrigger,
    /// Handlers that completed, in execution order.
    pub executed: Vec<String>,
    /// Handlers that failed, in execution order.
    pub failed: Vec<HandlerFailure>,
    /// Handlers that never finished, because of an abort or the watchdog.
    pub skipped: Vec<String>,
    /// Whether a failure stopped the sequence early.
    pub aborted: bool,
    /// Whether the watchdog fired.
    pub timed_out: bool,
    /// The exit code chosen for the process.
    pub exit_code: i32,
    /// Time spent running handlers.
    pub duration: Duration,
}

impl ShutdownReport {
    /// Returns `true` if every handler ran and succeeded in time.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty() && !self.timed_out
    }
}

/// Runs cleanup handlers in priority order when the process terminates.
///
/// Handlers run one at a time, highest priority first; equal priorities run
/// in registration order. The whole sequence is bounded by a watchdog timeout.
/// A failing handler is logged and skipped unless `abort_on_error` is set.
///
/// Only the first trigger starts a shutdown; later ones are ignored.
///
/// ```rust,no_run
/// use bulwark_shutdown::{ShutdownConfig, ShutdownCoordinator};
/// use std::time::Duration;
///
/// # async fn example() {
/// let coordinator = ShutdownCoordinator::new(
///     ShutdownConfig::builder().timeout(Duration::from_secs(10)).build(),
/// );
///
/// coordinator.register("http", 100, || async {
///     // stop accepting requests
///     Ok::<_, std::io::Error>(())
/// });
/// coordinator.register("database", 10, || async {
///     // close the pool
///     Ok::<_, std::io::Error>(())
/// });
///
/// coordinator.listen_for_signals();
/// # }
/// ```
#[derive(Clone)]
pub struct ShutdownCoordinator {
    shared: Arc<Shared>,
}

impl ShutdownCoordinator {
    /// Creates a coordinator that ends the process with [`std::process::exit`].
    pub fn new(config: ShutdownConfig) -> Self {
        Self::with_exit(config, ProcessExit)
    }

    /// Creates a coordinator that ends the process through `exit`.
    pub fn with_exit<X: Exit + 'static>(config: ShutdownConfig, exit: X) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                exit: Box::new(exit),
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// The coordinator's configuration.
    pub fn config(&self) -> &ShutdownConfig {
        &self.shared.config
    }

    /// Registers a cleanup handler, replacing any handler with the same name.
    ///
    /// Higher priorities run first. Registrations after shutdown has started
    /// are ignored.
    pub fn register<F, Fut, E>(&self, name: impl Into<String>, priority: i32, handler: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let name = name.into();
        let run: HandlerFn = Box::new(move || handler().map(|r| r.map_err(Into::into)).boxed());

        let mut state = self.shared.lock();
        if state.shutting_down {
            tracing::warn!(handler = %name, "shutdown in progress, handler not registered");
            return;
        }

        if let Some(index) = state.handlers.iter().position(|h| h.name == name) {
            let previous = state.handlers.remove(index);
            tracing::warn!(
                handler = %name,
                previous_priority = previous.priority,
                priority,
                "replacing shutdown handler"
            );
        }

        let index = state
            .handlers
            .iter()
            .position(|h| h.priority < priority)
            .unwrap_or(state.handlers.len());
        state.handlers.insert(index, Registered { name, priority, run });
    }

    /// Removes a handler. Returns `false` if no handler had that name.
    pub fn unregister(&self, name: &str) -> bool {
        let mut state = self.shared.lock();
        let before = state.handlers.len();
        state.handlers.retain(|h| h.name != name);
        state.handlers.len() != before
    }

    /// Registered handlers as `(name, priority)`, in execution order.
    ///
    /// Empty once a shutdown has started, since handlers are consumed by it.
    pub fn handlers(&self) -> Vec<(String, i32)> {
        self.shared
            .lock()
            .handlers
            .iter()
            .map(|h| (h.name.clone(), h.priority))
            .collect()
    }

    /// Returns `true` once a shutdown has started.
    pub fn is_shutting_down(&self) -> bool {
        self.shared.lock().shutting_down
    }

    /// Current status.
    pub fn status(&self) -> ShutdownStatus {
        let state = self.shared.lock();
        ShutdownStatus {
            is_shutting_down: state.shutting_down,
            trigger: state.trigger.clone(),
            started_at: state.started_at,
            handlers_executed: state.executed.clone(),
            handlers_failed: state.failed.iter().map(|f| f.name.clone()).collect(),
        }
    }

    /// Runs the shutdown sequence and exits the process.
    ///
    /// Returns `None` without doing anything if a shutdown is already running
    /// or finished. Otherwise returns the report, which is only observable when
    /// exiting is disabled or replaced.
    pub async fn shutdown(&self, trigger: ShutdownTrigger) -> Option<ShutdownReport> {
        let shared = &self.shared;
        let config = &shared.config;

        let handlers = {
            let mut state = shared.lock();
            if state.shutting_down {
                tracing::debug!(%trigger, "shutdown already in progress, trigger ignored");
                return None;
            }
            state.shutting_down = true;
            state.trigger = Some(trigger.clone());
            state.started_at = Some(Instant::now());
            std::mem::take(&mut state.handlers)
        };

        let names: Vec<String> = handlers.iter().map(|h| h.name.clone()).collect();
        tracing::info!(
            %trigger,
            handlers = names.len(),
            timeout = ?config.timeout,
            "starting graceful shutdown"
        );
        shared.emit(ShutdownEvent::Started {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            trigger: trigger.clone(),
            handlers: names.len(),
        });

        let start = tokio::time::Instant::now();
        let outcome = tokio::time::timeout(config.timeout, self.run_handlers(handlers)).await;
        let duration = start.elapsed();

        let (executed, failed) = {
            let state = shared.lock();
            (state.executed.clone(), state.failed.clone())
        };
        let skipped = names
            .into_iter()
            .skip(executed.len() + failed.len())
            .collect::<Vec<_>>();

        let Ok(aborted) = outcome else {
            tracing::error!(
                timeout = ?config.timeout,
                unfinished = ?skipped,
                "shutdown timed out, forcing exit"
            );
            shared.emit(ShutdownEvent::TimedOut {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                exit_code: config.force_exit_code,
            });
            shared.exit.exit(config.force_exit_code);
            return Some(ShutdownReport {
                trigger,
                executed,
                failed,
                skipped,
                aborted: false,
                timed_out: true,
                exit_code: config.force_exit_code,
                duration,
            });
        };

        let exit_code = if failed.is_empty() {
            config.success_exit_code
        } else {
            config.failure_exit_code
        };
        tracing::info!(
            executed = executed.len(),
            failed = failed.len(),
            skipped = skipped.len(),
            exit_code,
            ?duration,
            "shutdown complete"
        );
        shared.emit(ShutdownEvent::Completed {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            exit_code,
            duration,
        });

        let report = ShutdownReport {
            trigger,
            executed,
            failed,
            skipped,
            aborted,
            timed_out: false,
            exit_code,
            duration,
        };
        if config.exit_on_complete {
            shared.exit.exit(exit_code);
        }
        Some(report)
    }

    /// Starts a shutdown after an unrecoverable error.
    pub async fn trigger_fatal(&self, message: impl Into<String>) -> Option<ShutdownReport> {
        let message = message.into();
        tracing::error!(%message, "fatal error, shutting down");
        self.shutdown(ShutdownTrigger::Fatal(message)).await
    }

    /// Spawns a task that starts a shutdown on SIGINT or SIGTERM (Ctrl-C
    /// outside Unix).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn listen_for_signals(&self) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let signal = wait_for_signal().await;
            tracing::info!(signal, "termination signal received");
            coordinator.shutdown(ShutdownTrigger::signal(signal)).await;
        })
    }

    /// Runs handlers in order. Returns `true` if a failure stopped the sequence.
    async fn run_handlers(&self, handlers: Vec<Registered>) -> bool {
        let shared = &self.shared;
        let config = &shared.config;

        for Registered {
            name,
            priority,
            run,
        } in handlers
        {
            let span = tracing::info_span!("shutdown_handler", handler = %name, priority);
            let started = tokio::time::Instant::now();

            let outcome = AssertUnwindSafe(async move { run().await })
                .catch_unwind()
                .instrument(span.clone())
                .await;
            let elapsed = started.elapsed();

            let error = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(error)) => Some(error.to_string()),
                Err(panic) => Some(panic_message(panic.as_ref())),
            };

            match error {
                None => {
                    tracing::info!(parent: &span, ?elapsed, "shutdown handler completed");
                    shared.lock().executed.push(name.clone());
                    shared.emit(ShutdownEvent::HandlerCompleted {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        handler: name,
                        duration: elapsed,
                    });
                }
                Some(message) => {
                    tracing::error!(parent: &span, error = %message, "shutdown handler failed");
                    shared.lock().failed.push(HandlerFailure {
                        name: name.clone(),
                        message: message.clone(),
                    });
                    shared.emit(ShutdownEvent::HandlerFailed {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        handler: name,
                        message,
                    });
                    if config.abort_on_error {
                        tracing::warn!("aborting shutdown sequence after handler failure");
                        return true;
                    }
                }
            }
        }
        false
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("ShutdownCoordinator")
            .field("name", &self.shared.config.name)
            .field("handlers", &state.handlers.len())
            .field("shutting_down", &state.shutting_down)
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

async fn wait_for_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = terminate.recv() => "SIGTERM",
                    name = ctrl_c() => name,
                }
            }
            Err(error) => {
                tracing::error!(%error, "failed to install SIGTERM handler");
                ctrl_c().await
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await
    }
}

async fn ctrl_c() -> &'static str {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
