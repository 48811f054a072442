//! # Resilience Module
//!
//! Circuit breakers that isolate the record store from callers when it misbehaves.
//!
//! ## Architecture
//!
//! - **Circuit Breakers**: failure-rate based Closed / Open / Half-Open state machine per
//!   named circuit, with a per-circuit admission pool
//! - **Rolling Window**: bucketed recent outcomes feeding the trip decision
//! - **Metrics Collection**: lifetime counters and window snapshots per circuit
//! - **Manager**: lazily populated process-wide registry keyed by circuit name
//!
//! ## Usage
//!
//! ```rust
//! use records_core::resilience::{CallOutcome, CircuitBreakerManager, CircuitState};
//! use std::time::Duration;
//!
//! let manager = CircuitBreakerManager::default();
//! let circuit = manager.get_circuit_breaker("select_records");
//!
//! if let Some(admission) = circuit.allow_request() {
//!     circuit.record(CallOutcome::Success, Duration::from_millis(3), Some(admission));
//! }
//! assert_eq!(circuit.state(), CircuitState::Closed);
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod manager;
pub mod metrics;
pub mod rolling_window;

pub use circuit_breaker::{Admission, BreakerError, CircuitBreaker, CircuitState};
pub use config::CircuitSettings;
pub use manager::CircuitBreakerManager;
pub use metrics::{CircuitBreakerMetrics, CircuitTotals, SystemCircuitBreakerMetrics};
pub use rolling_window::{BucketCounts, CallOutcome, RollingWindow};
