//! # Command Executor
//!
//! Runs each unit of work on its own tokio task under a named circuit and delivers exactly one
//! outcome per invocation.
//!
//! Admission happens on the caller's side: an open circuit or a full admission pool refuses the
//! call before anything is spawned. Once admitted, the operation runs on a runner task that
//! catches panics, while a separate deadline task owns the circuit timeout, so an operation that
//! blocks its worker thread cannot hold the timeout back. Whoever settles the invocation first
//! records the circuit statistics and posts the outcome; everything after that is discarded.

use crate::execution::command::{
    command_channels, CommandError, CommandReply, CommandSenders, Invocation,
};
use crate::resilience::{BreakerError, CallOutcome, CircuitBreakerManager};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Executes commands under the circuits of a shared [`CircuitBreakerManager`]
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    manager: Arc<CircuitBreakerManager>,
}

impl CommandExecutor {
    pub fn new(manager: Arc<CircuitBreakerManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<CircuitBreakerManager> {
        &self.manager
    }

    /// Run `task` under `circuit` and wait for its single outcome
    pub async fn run<T, E, F, Fut>(&self, circuit: &str, task: F) -> Result<T, CommandError<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: FnOnce(CommandReply<T, E>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (senders, receivers) = command_channels();
        let rejections = self.go(circuit, senders, task);
        receivers.wait(rejections, circuit).await
    }

    /// Submit `task` under `circuit` without waiting
    ///
    /// The returned receiver yields the breaker-level failure, if any; success values and
    /// domain errors arrive on the receivers paired with `senders`.
    pub fn go<T, E, F, Fut>(
        &self,
        circuit: &str,
        senders: CommandSenders<T, E>,
        task: F,
    ) -> mpsc::Receiver<BreakerError>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: FnOnce(CommandReply<T, E>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (rejections_tx, rejections_rx) = mpsc::channel(1);

        if !self.manager.enabled() {
            let invocation = Arc::new(Invocation::new(circuit, None, None, rejections_tx));
            let reply = CommandReply::new(Arc::clone(&invocation), senders);
            tokio::spawn(run_invocation(invocation, async move { task(reply).await }));
            return rejections_rx;
        }

        let breaker = self.manager.get_circuit_breaker(circuit);

        let Some(admission) = breaker.allow_request() else {
            breaker.record(CallOutcome::ShortCircuited, Duration::ZERO, None);
            let _ = rejections_tx.try_send(BreakerError::CircuitOpen {
                circuit: circuit.to_string(),
            });
            return rejections_rx;
        };

        let Some(permit) = breaker.try_acquire() else {
            let limit = breaker.settings().max_concurrent_requests;
            warn!(circuit = circuit, limit = limit, "🚦 Admission pool exhausted, rejecting call");
            breaker.record(CallOutcome::Rejected, Duration::ZERO, Some(admission));
            let _ = rejections_tx.try_send(BreakerError::MaxConcurrency {
                circuit: circuit.to_string(),
                limit,
            });
            return rejections_rx;
        };

        let timeout = breaker.settings().timeout;
        let invocation = Arc::new(Invocation::new(
            circuit,
            Some(breaker),
            Some(admission),
            rejections_tx,
        ));
        let reply = CommandReply::new(Arc::clone(&invocation), senders);

        debug!(circuit = circuit, admission = ?admission, "Spawning command");

        // Deadline first: the runner takes the worker's LIFO slot, the deadline stays stealable
        spawn_deadline(Arc::clone(&invocation), timeout);

        tokio::spawn(async move {
            // Held until the operation has really finished, not just until the caller gave up
            let _permit = permit;
            run_invocation(invocation, async move { task(reply).await }).await;
        });

        rejections_rx
    }
}

/// Settle the invocation with a timeout unless something else settles it first
fn spawn_deadline(invocation: Arc<Invocation>, timeout: Duration) {
    let settled = invocation.cancellation();

    tokio::spawn(async move {
        tokio::select! {
            _ = settled.cancelled() => {}
            _ = tokio::time::sleep(timeout) => {
                if invocation.settle_breaker(BreakerError::Timeout {
                    circuit: invocation.circuit().to_string(),
                    timeout,
                }) {
                    warn!(
                        circuit = %invocation.circuit(),
                        timeout_ms = timeout.as_millis() as u64,
                        "⏱️ Command timed out"
                    );
                }
            }
        }
    });
}

/// Drive the operation inside an unwind boundary
async fn run_invocation<Fut>(invocation: Arc<Invocation>, operation: Fut)
where
    Fut: Future<Output = ()> + Send,
{
    let Err(panic_error) = AssertUnwindSafe(operation).catch_unwind().await else {
        return;
    };

    let panic_msg = if let Some(s) = panic_error.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_error.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    };

    error!(
        circuit = %invocation.circuit(),
        panic_msg = %panic_msg,
        "Command panicked"
    );

    invocation.settle_breaker(BreakerError::Panicked {
        circuit: invocation.circuit().to_string(),
        message: panic_msg,
    });
}
