//! # Circuit Breaker Implementation
//!
//! Failure-rate based circuit breaker with three states: Closed (normal operation), Open
//! (failing fast) and Half-Open (a single probe testing recovery).
//!
//! Every finished invocation is recorded into a rolling window. Once the window holds at least
//! `request_volume_threshold` requests and the error percentage reaches
//! `error_percent_threshold`, the circuit opens. After `sleep_window` exactly one caller is
//! admitted as a probe; its outcome alone decides whether the circuit closes or reopens.

use crate::constants::circuit_defaults;
use crate::resilience::{
    BucketCounts, CallOutcome, CircuitBreakerMetrics, CircuitSettings, CircuitTotals,
    RollingWindow,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Recovery probe in flight - everything else fails fast
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open, // Default to safest state
        }
    }
}

/// Breaker-level failures, distinct from anything the wrapped operation reports
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakerError {
    #[error("Circuit breaker is open for {circuit}")]
    CircuitOpen { circuit: String },

    #[error("Circuit {circuit} timed out after {timeout:?}")]
    Timeout { circuit: String, timeout: Duration },

    #[error("Circuit {circuit} rejected the call: {limit} concurrent requests already in flight")]
    MaxConcurrency { circuit: String, limit: usize },

    #[error("Operation under circuit {circuit} panicked: {message}")]
    Panicked { circuit: String, message: String },

    #[error("Operation under circuit {circuit} finished without reporting an outcome")]
    NoOutcome { circuit: String },
}

impl BreakerError {
    /// Circuit the failure was raised for
    pub fn circuit(&self) -> &str {
        match self {
            BreakerError::CircuitOpen { circuit }
            | BreakerError::Timeout { circuit, .. }
            | BreakerError::MaxConcurrency { circuit, .. }
            | BreakerError::Panicked { circuit, .. }
            | BreakerError::NoOutcome { circuit } => circuit,
        }
    }

    /// How the failure is accounted for in the circuit statistics
    pub fn outcome(&self) -> CallOutcome {
        match self {
            BreakerError::CircuitOpen { .. } => CallOutcome::ShortCircuited,
            BreakerError::Timeout { .. } => CallOutcome::Timeout,
            BreakerError::MaxConcurrency { .. } => CallOutcome::Rejected,
            BreakerError::Panicked { .. } | BreakerError::NoOutcome { .. } => CallOutcome::Panicked,
        }
    }
}

/// How an invocation was let through the circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Circuit closed, ordinary call
    Normal,
    /// The single half-open probe; its outcome decides the next state
    Probe,
}

/// Core circuit breaker with atomic state and lock-protected statistics
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Circuit name for logging and metrics
    name: String,

    /// Current circuit state (atomic for thread safety)
    state: AtomicU8,

    /// Settings, replaceable at runtime (last writer wins)
    settings: RwLock<CircuitSettings>,

    /// Admission pool sized by `max_concurrent_requests`, resized in place on reconfiguration
    admission: Arc<Semaphore>,

    /// Permits still held by in-flight calls that must be retired after a shrink
    permit_debt: Mutex<usize>,

    /// Recent outcomes for the trip decision
    window: Mutex<RollingWindow>,

    /// Lifetime counters
    totals: Mutex<CircuitTotals>,

    /// Time when circuit was opened (for sleep window calculations)
    opened_at: Mutex<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(name: String, settings: CircuitSettings) -> Self {
        let window = RollingWindow::new(
            circuit_defaults::ROLLING_WINDOW_BUCKETS,
            Duration::from_millis(circuit_defaults::BUCKET_WIDTH_MS),
        );

        info!(
            circuit = %name,
            timeout_ms = settings.timeout.as_millis() as u64,
            max_concurrent_requests = settings.max_concurrent_requests,
            error_percent_threshold = settings.error_percent_threshold,
            request_volume_threshold = settings.request_volume_threshold,
            sleep_window_ms = settings.sleep_window.as_millis() as u64,
            rolling_window_ms = window.span().as_millis() as u64,
            "🛡️ Circuit breaker initialized"
        );

        Self {
            admission: Arc::new(Semaphore::new(settings.max_concurrent_requests)),
            permit_debt: Mutex::new(0),
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            settings: RwLock::new(settings),
            window: Mutex::new(window),
            totals: Mutex::new(CircuitTotals::default()),
            opened_at: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    pub fn settings(&self) -> CircuitSettings {
        self.settings.read().clone()
    }

    /// Replace the settings while keeping state, statistics and in-flight permits
    pub fn update_settings(&self, settings: CircuitSettings) {
        let mut current = self.settings.write();
        let previous_limit = current.max_concurrent_requests;
        let limit = settings.max_concurrent_requests;

        if limit > previous_limit {
            let mut debt = self.permit_debt.lock();
            let grow = limit - previous_limit;
            let repaid = grow.min(*debt);
            *debt -= repaid;
            self.admission.add_permits(grow - repaid);
        } else if limit < previous_limit {
            let shrink = previous_limit - limit;
            let retired = self.admission.forget_permits(shrink);
            *self.permit_debt.lock() += shrink - retired;
        }

        *current = settings.clone();
        drop(current);

        debug!(
            circuit = %self.name,
            timeout_ms = settings.timeout.as_millis() as u64,
            max_concurrent_requests = settings.max_concurrent_requests,
            error_percent_threshold = settings.error_percent_threshold,
            "⚙️ Circuit breaker settings replaced"
        );
    }

    /// Decide whether a call may run; `None` means it must be short-circuited
    pub fn allow_request(&self) -> Option<Admission> {
        match self.state() {
            CircuitState::Closed => Some(Admission::Normal),
            CircuitState::HalfOpen => None,
            CircuitState::Open => {
                let sleep_window = self.settings.read().sleep_window;
                let elapsed = match *self.opened_at.lock() {
                    Some(opened) => opened.elapsed() >= sleep_window,
                    None => {
                        warn!(circuit = %self.name, "Circuit open but no timestamp recorded");
                        true
                    }
                };

                if !elapsed {
                    return None;
                }

                // Only the caller that wins the swap gets to probe
                match self.state.compare_exchange(
                    CircuitState::Open as u8,
                    CircuitState::HalfOpen as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => {
                        info!(circuit = %self.name, "🟡 Circuit breaker half-open (probing recovery)");
                        Some(Admission::Probe)
                    }
                    Err(_) => None,
                }
            }
        }
    }

    /// Take an admission permit without waiting
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        {
            // Permits returned since a shrink are retired before anyone new is admitted
            let mut debt = self.permit_debt.lock();
            if *debt > 0 {
                *debt -= self.admission.forget_permits(*debt);
            }
        }

        Arc::clone(&self.admission).try_acquire_owned().ok()
    }

    /// Number of invocations currently holding a permit
    pub fn in_flight(&self) -> usize {
        let limit = self.settings.read().max_concurrent_requests;
        let debt = *self.permit_debt.lock();
        let available = self.admission.available_permits();
        (limit + debt).saturating_sub(available)
    }

    /// Record one settled invocation and apply the state transition policy
    pub fn record(&self, outcome: CallOutcome, duration: Duration, admission: Option<Admission>) {
        let now = Instant::now();
        self.record_totals(outcome, duration);

        let snapshot = {
            let mut window = self.window.lock();
            window.record(outcome, now);
            window.snapshot(now)
        };

        let is_probe = admission == Some(Admission::Probe);

        match outcome {
            CallOutcome::ShortCircuited => {
                debug!(circuit = %self.name, "⚡ Call short-circuited");
            }
            CallOutcome::Success => {
                debug!(
                    circuit = %self.name,
                    duration_ms = duration.as_millis() as u64,
                    "🟢 Operation succeeded"
                );
                if is_probe {
                    self.transition_to_closed();
                }
            }
            _ => {
                warn!(
                    circuit = %self.name,
                    outcome = ?outcome,
                    duration_ms = duration.as_millis() as u64,
                    "🔴 Operation failed"
                );
                if is_probe {
                    self.transition_to_open(CircuitState::HalfOpen, &snapshot);
                } else if self.state() == CircuitState::Closed && self.should_trip(&snapshot) {
                    self.transition_to_open(CircuitState::Closed, &snapshot);
                }
            }
        }
    }

    fn record_totals(&self, outcome: CallOutcome, duration: Duration) {
        let mut totals = self.totals.lock();
        match outcome {
            CallOutcome::Success => {
                totals.success_count += 1;
                totals.total_duration += duration;
            }
            CallOutcome::Failure => totals.failure_count += 1,
            CallOutcome::Timeout => totals.timeout_count += 1,
            CallOutcome::Rejected => totals.rejected_count += 1,
            CallOutcome::Panicked => totals.panic_count += 1,
            CallOutcome::ShortCircuited => totals.short_circuited_count += 1,
        }
    }

    fn should_trip(&self, snapshot: &BucketCounts) -> bool {
        let settings = self.settings.read();
        snapshot.request_count() >= settings.request_volume_threshold
            && snapshot.error_percentage() >= f64::from(settings.error_percent_threshold)
    }

    /// Transition to open state, only if still in `from`
    fn transition_to_open(&self, from: CircuitState, snapshot: &BucketCounts) {
        if self
            .state
            .compare_exchange(
                from as u8,
                CircuitState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        *self.opened_at.lock() = Some(Instant::now());

        let settings = self.settings.read();
        error!(
            circuit = %self.name,
            from_state = ?from,
            window_requests = snapshot.request_count(),
            window_errors = snapshot.error_count(),
            error_percentage = snapshot.error_percentage(),
            error_percent_threshold = settings.error_percent_threshold,
            sleep_window_ms = settings.sleep_window.as_millis() as u64,
            "🔴 Circuit breaker opened (failing fast)"
        );
    }

    /// Transition to closed state (normal operation)
    fn transition_to_closed(&self) {
        self.state
            .store(CircuitState::Closed as u8, Ordering::Release);
        self.window.lock().reset();
        *self.opened_at.lock() = None;

        info!(
            circuit = %self.name,
            total_calls = self.totals.lock().total_calls(),
            "🟢 Circuit breaker closed (recovered)"
        );
    }

    /// Force circuit to open state (for emergency situations)
    pub fn force_open(&self) {
        warn!(circuit = %self.name, "🚨 Circuit breaker forced open");
        self.state.store(CircuitState::Open as u8, Ordering::Release);
        *self.opened_at.lock() = Some(Instant::now());
    }

    /// Force circuit to closed state (for emergency recovery)
    pub fn force_closed(&self) {
        warn!(circuit = %self.name, "🚨 Circuit breaker forced closed");
        self.transition_to_closed();
    }

    /// Get current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let totals = self.totals.lock().clone();
        let window = self.window.lock().snapshot(Instant::now());
        CircuitBreakerMetrics::from_parts(totals, window, self.state(), self.in_flight())
    }

    /// Closed with a low failure rate
    pub fn is_healthy(&self) -> bool {
        self.metrics().is_healthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(volume: u64, threshold: u8, sleep_window: Duration) -> CircuitSettings {
        CircuitSettings {
            timeout: Duration::from_millis(100),
            max_concurrent_requests: 2,
            error_percent_threshold: threshold,
            request_volume_threshold: volume,
            sleep_window,
        }
    }

    fn admit(circuit: &CircuitBreaker, outcome: CallOutcome) {
        let admission = circuit.allow_request();
        assert!(admission.is_some(), "call should be admitted");
        circuit.record(outcome, Duration::from_millis(1), admission);
    }

    #[test]
    fn test_stays_closed_below_volume_threshold() {
        let circuit = CircuitBreaker::new("test".to_string(), settings(5, 50, Duration::from_secs(1)));

        for _ in 0..4 {
            admit(&circuit, CallOutcome::Failure);
        }

        assert_eq!(circuit.state(), CircuitState::Closed);
        assert_eq!(circuit.metrics().totals.failure_count, 4);
    }

    #[test]
    fn test_opens_when_error_percentage_reached() {
        let circuit = CircuitBreaker::new("test".to_string(), settings(4, 50, Duration::from_secs(1)));

        admit(&circuit, CallOutcome::Success);
        admit(&circuit, CallOutcome::Success);
        admit(&circuit, CallOutcome::Failure);
        assert_eq!(circuit.state(), CircuitState::Closed);

        admit(&circuit, CallOutcome::Timeout);
        assert_eq!(circuit.state(), CircuitState::Open);
        assert!(circuit.allow_request().is_none());
    }

    #[test]
    fn test_single_probe_after_sleep_window() {
        let circuit = CircuitBreaker::new("test".to_string(), settings(1, 50, Duration::from_millis(20)));
        admit(&circuit, CallOutcome::Failure);
        assert_eq!(circuit.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(circuit.allow_request(), Some(Admission::Probe));
        assert_eq!(circuit.state(), CircuitState::HalfOpen);
        // Everyone else is turned away while the probe is in flight
        assert_eq!(circuit.allow_request(), None);

        circuit.record(CallOutcome::Success, Duration::from_millis(1), Some(Admission::Probe));
        assert_eq!(circuit.state(), CircuitState::Closed);
        assert_eq!(circuit.metrics().window.request_count(), 0);
    }

    #[test]
    fn test_failed_probe_reopens_and_restarts_sleep_window() {
        let circuit = CircuitBreaker::new("test".to_string(), settings(1, 50, Duration::from_millis(20)));
        admit(&circuit, CallOutcome::Failure);
        std::thread::sleep(Duration::from_millis(30));

        let probe = circuit.allow_request();
        assert_eq!(probe, Some(Admission::Probe));
        circuit.record(CallOutcome::Failure, Duration::from_millis(1), probe);

        assert_eq!(circuit.state(), CircuitState::Open);
        assert!(circuit.allow_request().is_none());

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(circuit.allow_request(), Some(Admission::Probe));
    }

    #[test]
    fn test_non_probe_outcome_does_not_decide_half_open() {
        let circuit = CircuitBreaker::new("test".to_string(), settings(1, 50, Duration::from_millis(10)));
        admit(&circuit, CallOutcome::Failure);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(circuit.allow_request(), Some(Admission::Probe));

        // A straggler admitted before the trip finishes while the probe is in flight
        circuit.record(CallOutcome::Success, Duration::from_millis(1), Some(Admission::Normal));
        assert_eq!(circuit.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_admission_pool() {
        let circuit = CircuitBreaker::new("test".to_string(), settings(5, 50, Duration::from_secs(1)));

        let first = circuit.try_acquire();
        let second = circuit.try_acquire();
        assert!(first.is_some() && second.is_some());
        assert!(circuit.try_acquire().is_none());
        assert_eq!(circuit.in_flight(), 2);

        drop(first);
        assert!(circuit.try_acquire().is_some());
    }

    #[test]
    fn test_growing_limit_counts_permits_already_held() {
        let circuit = CircuitBreaker::new("test".to_string(), CircuitSettings {
            max_concurrent_requests: 1,
            ..CircuitSettings::default()
        });
        let held = circuit.try_acquire();
        assert!(held.is_some());

        circuit.update_settings(CircuitSettings {
            max_concurrent_requests: 2,
            ..CircuitSettings::default()
        });

        let second = circuit.try_acquire();
        assert!(second.is_some());
        assert!(circuit.try_acquire().is_none());
        assert_eq!(circuit.in_flight(), 2);
    }

    #[test]
    fn test_shrinking_limit_waits_for_held_permits() {
        let circuit = CircuitBreaker::new("test".to_string(), CircuitSettings {
            max_concurrent_requests: 3,
            ..CircuitSettings::default()
        });
        let first = circuit.try_acquire();
        let second = circuit.try_acquire();

        circuit.update_settings(CircuitSettings {
            max_concurrent_requests: 1,
            ..CircuitSettings::default()
        });
        assert_eq!(circuit.in_flight(), 2);
        assert!(circuit.try_acquire().is_none());

        drop(first);
        assert_eq!(circuit.in_flight(), 1);
        assert!(circuit.try_acquire().is_none());

        drop(second);
        assert_eq!(circuit.in_flight(), 0);
        let only = circuit.try_acquire();
        assert!(only.is_some());
        assert!(circuit.try_acquire().is_none());
        assert_eq!(circuit.in_flight(), 1);
    }

    #[test]
    fn test_update_settings_keeps_state() {
        let circuit = CircuitBreaker::new("test".to_string(), settings(1, 50, Duration::from_secs(5)));
        admit(&circuit, CallOutcome::Failure);
        assert_eq!(circuit.state(), CircuitState::Open);

        circuit.update_settings(settings(10, 90, Duration::from_secs(1)));

        assert_eq!(circuit.state(), CircuitState::Open);
        assert_eq!(circuit.settings().request_volume_threshold, 10);
        assert_eq!(circuit.metrics().totals.failure_count, 1);
    }

    #[test]
    fn test_force_operations() {
        let circuit = CircuitBreaker::new("test".to_string(), CircuitSettings::default());

        circuit.force_open();
        assert_eq!(circuit.state(), CircuitState::Open);
        assert!(circuit.allow_request().is_none());

        circuit.force_closed();
        assert_eq!(circuit.state(), CircuitState::Closed);
        assert_eq!(circuit.allow_request(), Some(Admission::Normal));
    }

    #[test]
    fn test_breaker_error_accounting() {
        let open = BreakerError::CircuitOpen {
            circuit: "select_records".to_string(),
        };
        assert_eq!(open.outcome(), CallOutcome::ShortCircuited);
        assert_eq!(open.circuit(), "select_records");

        let full = BreakerError::MaxConcurrency {
            circuit: "insert_record".to_string(),
            limit: 10,
        };
        assert_eq!(full.outcome(), CallOutcome::Rejected);
        assert!(full.outcome().is_error());
    }
}
