//! Command plumbing shared by the executor and the work it runs.
//!
//! Every invocation gets three capacity-1 channels: one for the success value, one for the
//! operation's own error and one for breaker-level failures. A per-invocation settle guard makes
//! sure only the first of the operation, the timeout, the panic handler or the missing-outcome
//! check gets to post.

use crate::resilience::{Admission, BreakerError, CallOutcome, CircuitBreaker};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Result of an executed command as seen by the caller
#[derive(Debug, Error)]
pub enum CommandError<E> {
    /// The operation reported an error of its own
    #[error("{0}")]
    Domain(E),

    /// The breaker refused, timed out or lost the invocation
    #[error(transparent)]
    Breaker(#[from] BreakerError),
}

impl<E> CommandError<E> {
    pub fn is_breaker(&self) -> bool {
        matches!(self, CommandError::Breaker(_))
    }

    /// Collapse both kinds into the operation's error type
    pub fn flatten(self) -> E
    where
        E: From<BreakerError>,
    {
        match self {
            CommandError::Domain(error) => error,
            CommandError::Breaker(error) => E::from(error),
        }
    }
}

/// Sending halves handed to an invocation through its [`CommandReply`]
#[derive(Debug)]
pub struct CommandSenders<T, E> {
    output: mpsc::Sender<T>,
    errors: mpsc::Sender<E>,
}

/// Receiving halves the caller waits on
#[derive(Debug)]
pub struct CommandReceivers<T, E> {
    output: mpsc::Receiver<T>,
    errors: mpsc::Receiver<E>,
}

/// Fresh success and error channels for a single invocation
pub fn command_channels<T, E>() -> (CommandSenders<T, E>, CommandReceivers<T, E>) {
    let (output_tx, output_rx) = mpsc::channel(1);
    let (errors_tx, errors_rx) = mpsc::channel(1);

    (
        CommandSenders {
            output: output_tx,
            errors: errors_tx,
        },
        CommandReceivers {
            output: output_rx,
            errors: errors_rx,
        },
    )
}

impl<T, E> CommandReceivers<T, E> {
    /// Wait for whichever of the three channels delivers first
    pub async fn wait(
        mut self,
        mut rejections: mpsc::Receiver<BreakerError>,
        circuit: &str,
    ) -> Result<T, CommandError<E>> {
        tokio::select! {
            Some(value) = self.output.recv() => Ok(value),
            Some(error) = self.errors.recv() => Err(CommandError::Domain(error)),
            Some(error) = rejections.recv() => Err(CommandError::Breaker(error)),
            else => Err(CommandError::Breaker(BreakerError::NoOutcome {
                circuit: circuit.to_string(),
            })),
        }
    }
}

/// Per-invocation bookkeeping, shared by the reply, the runner task and the timer
#[derive(Debug)]
pub(crate) struct Invocation {
    circuit: String,
    breaker: Option<Arc<CircuitBreaker>>,
    admission: Option<Admission>,
    started: Instant,
    settled: AtomicBool,
    cancellation: CancellationToken,
    rejections: mpsc::Sender<BreakerError>,
}

impl Invocation {
    pub(crate) fn new(
        circuit: &str,
        breaker: Option<Arc<CircuitBreaker>>,
        admission: Option<Admission>,
        rejections: mpsc::Sender<BreakerError>,
    ) -> Self {
        Self {
            circuit: circuit.to_string(),
            breaker,
            admission,
            started: Instant::now(),
            settled: AtomicBool::new(false),
            cancellation: CancellationToken::new(),
            rejections,
        }
    }

    pub(crate) fn circuit(&self) -> &str {
        &self.circuit
    }

    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    /// Claim the invocation; the winner records statistics before anything is posted
    fn claim(&self, outcome: CallOutcome) -> bool {
        if self.settled.swap(true, Ordering::AcqRel) {
            return false;
        }

        if let Some(breaker) = &self.breaker {
            breaker.record(outcome, self.started.elapsed(), self.admission);
        }
        self.cancellation.cancel();
        true
    }

    /// Settle with a breaker-level failure if nobody got there first
    pub(crate) fn settle_breaker(&self, error: BreakerError) -> bool {
        if !self.claim(error.outcome()) {
            return false;
        }

        // Capacity 1 and a single winner, so this never finds the slot taken
        let _ = self.rejections.try_send(error);
        true
    }
}

/// Handle through which an operation reports its single outcome
#[derive(Debug)]
pub struct CommandReply<T, E> {
    invocation: Option<Arc<Invocation>>,
    senders: CommandSenders<T, E>,
}

impl<T, E> CommandReply<T, E> {
    pub(crate) fn new(invocation: Arc<Invocation>, senders: CommandSenders<T, E>) -> Self {
        Self {
            invocation: Some(invocation),
            senders,
        }
    }

    /// Circuit this invocation runs under
    pub fn circuit(&self) -> &str {
        self.invocation
            .as_ref()
            .map(|invocation| invocation.circuit())
            .unwrap_or_default()
    }

    /// Token cancelled as soon as the invocation is settled by anyone, e.g. on timeout
    pub fn cancellation_token(&self) -> CancellationToken {
        self.invocation
            .as_ref()
            .map(|invocation| invocation.cancellation())
            .unwrap_or_default()
    }

    /// Report a success value
    pub fn succeed(mut self, value: T) {
        if let Some(invocation) = self.invocation.take() {
            if invocation.claim(CallOutcome::Success) {
                let _ = self.senders.output.try_send(value);
            } else {
                debug!(circuit = %invocation.circuit(), "Discarding late result");
            }
        }
    }

    /// Report the operation's own error
    pub fn fail(mut self, error: E) {
        if let Some(invocation) = self.invocation.take() {
            if invocation.claim(CallOutcome::Failure) {
                let _ = self.senders.errors.try_send(error);
            } else {
                debug!(circuit = %invocation.circuit(), "Discarding late error");
            }
        }
    }

    /// Drive `future` and report its result, abandoning it once the invocation is settled
    pub async fn complete<Fut>(self, future: Fut)
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let cancellation = self.cancellation_token();

        tokio::select! {
            biased;
            result = future => match result {
                Ok(value) => self.succeed(value),
                Err(error) => self.fail(error),
            },
            _ = cancellation.cancelled() => {
                debug!(circuit = %self.circuit(), "Abandoning store call after timeout");
            }
        }
    }
}

impl<T, E> Drop for CommandReply<T, E> {
    fn drop(&mut self) {
        // Panics are settled by the runner once the unwind is caught
        if std::thread::panicking() {
            return;
        }

        if let Some(invocation) = self.invocation.take() {
            if !invocation.is_settled() {
                invocation.settle_breaker(BreakerError::NoOutcome {
                    circuit: invocation.circuit().to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation() -> (Arc<Invocation>, mpsc::Receiver<BreakerError>) {
        let (tx, rx) = mpsc::channel(1);
        (Arc::new(Invocation::new("test", None, None, tx)), rx)
    }

    #[tokio::test]
    async fn test_succeed_delivers_value() {
        let (invocation, rejections) = invocation();
        let (senders, receivers) = command_channels::<u32, String>();

        CommandReply::new(invocation, senders).succeed(7);

        assert_eq!(receivers.wait(rejections, "test").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_fail_delivers_domain_error() {
        let (invocation, rejections) = invocation();
        let (senders, receivers) = command_channels::<u32, String>();

        CommandReply::new(invocation, senders).fail("boom".to_string());

        match receivers.wait(rejections, "test").await {
            Err(CommandError::Domain(error)) => assert_eq!(error, "boom"),
            other => panic!("expected domain error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropped_reply_reports_no_outcome() {
        let (invocation, rejections) = invocation();
        let (senders, receivers) = command_channels::<u32, String>();

        drop(CommandReply::new(invocation, senders));

        match receivers.wait(rejections, "test").await {
            Err(CommandError::Breaker(BreakerError::NoOutcome { circuit })) => {
                assert_eq!(circuit, "test")
            }
            other => panic!("expected no-outcome error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_first_writer_wins() {
        let (invocation, rejections) = invocation();
        let (senders, receivers) = command_channels::<u32, String>();
        let reply = CommandReply::new(Arc::clone(&invocation), senders);

        assert!(invocation.settle_breaker(BreakerError::Timeout {
            circuit: "test".to_string(),
            timeout: std::time::Duration::from_millis(5),
        }));
        assert!(reply.cancellation_token().is_cancelled());

        // Late value is swallowed, the timeout stays the only outcome
        reply.succeed(1);
        assert!(!invocation.settle_breaker(BreakerError::NoOutcome {
            circuit: "test".to_string(),
        }));

        assert!(matches!(
            receivers.wait(rejections, "test").await,
            Err(CommandError::Breaker(BreakerError::Timeout { .. }))
        ));
    }

    #[test]
    fn test_flatten_into_domain_type() {
        #[derive(Debug, PartialEq)]
        enum StoreError {
            Missing,
            Breaker(BreakerError),
        }

        impl From<BreakerError> for StoreError {
            fn from(error: BreakerError) -> Self {
                StoreError::Breaker(error)
            }
        }

        assert_eq!(CommandError::Domain(StoreError::Missing).flatten(), StoreError::Missing);

        let open = BreakerError::CircuitOpen {
            circuit: "select_records".to_string(),
        };
        let flattened = CommandError::<StoreError>::Breaker(open.clone()).flatten();
        assert_eq!(flattened, StoreError::Breaker(open));
    }
}
