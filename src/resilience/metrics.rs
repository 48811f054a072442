//! # Circuit Breaker Metrics
//!
//! Point-in-time snapshots of circuit statistics, for a single circuit and aggregated across
//! the registry.

use crate::resilience::{BucketCounts, CircuitState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Lifetime counters kept by every circuit breaker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitTotals {
    pub success_count: u64,
    pub failure_count: u64,
    pub timeout_count: u64,
    pub rejected_count: u64,
    pub panic_count: u64,
    pub short_circuited_count: u64,
    pub total_duration: Duration,
}

impl CircuitTotals {
    /// Invocations that actually reached admission (short-circuits excluded)
    pub fn total_calls(&self) -> u64 {
        self.success_count + self.error_count()
    }

    pub fn error_count(&self) -> u64 {
        self.failure_count + self.timeout_count + self.rejected_count + self.panic_count
    }
}

/// Metrics for a single circuit breaker instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Lifetime counters
    pub totals: CircuitTotals,

    /// Counters inside the current rolling window
    pub window: BucketCounts,

    /// Current circuit breaker state
    pub current_state: CircuitState,

    /// Error percentage inside the rolling window (0.0 to 100.0)
    pub window_error_percentage: f64,

    /// Lifetime failure rate (0.0 to 1.0)
    pub failure_rate: f64,

    /// Lifetime success rate (0.0 to 1.0)
    pub success_rate: f64,

    /// Average duration of successful operations
    pub average_duration: Duration,

    /// Invocations currently holding an admission permit
    pub in_flight: usize,
}

impl CircuitBreakerMetrics {
    /// Derive rates from raw counters
    pub fn from_parts(
        totals: CircuitTotals,
        window: BucketCounts,
        current_state: CircuitState,
        in_flight: usize,
    ) -> Self {
        let total_calls = totals.total_calls();
        let (failure_rate, success_rate) = if total_calls > 0 {
            (
                totals.error_count() as f64 / total_calls as f64,
                totals.success_count as f64 / total_calls as f64,
            )
        } else {
            (0.0, 0.0)
        };

        let average_duration = if totals.success_count > 0 {
            totals.total_duration / totals.success_count.min(u32::MAX as u64) as u32
        } else {
            Duration::ZERO
        };

        Self {
            window_error_percentage: window.error_percentage(),
            totals,
            window,
            current_state,
            failure_rate,
            success_rate,
            average_duration,
            in_flight,
        }
    }

    pub fn total_calls(&self) -> u64 {
        self.totals.total_calls()
    }

    /// Check if metrics indicate healthy operation
    pub fn is_healthy(&self) -> bool {
        match self.current_state {
            CircuitState::Closed => self.failure_rate < 0.1,
            CircuitState::Open => false,
            CircuitState::HalfOpen => true,
        }
    }

    /// Get human-readable state description
    pub fn state_description(&self) -> &'static str {
        match self.current_state {
            CircuitState::Closed => "Healthy - Normal operation",
            CircuitState::Open => "Failing - Rejecting all calls",
            CircuitState::HalfOpen => "Recovering - Probing store health",
        }
    }

    /// Format metrics for logging
    pub fn format_summary(&self) -> String {
        format!(
            "State: {} | Calls: {} | Success: {:.1}% | Errors: {} | Short-circuited: {} | Window errors: {:.1}% | Avg Duration: {}ms",
            self.state_description(),
            self.total_calls(),
            self.success_rate * 100.0,
            self.totals.error_count(),
            self.totals.short_circuited_count,
            self.window_error_percentage,
            self.average_duration.as_millis()
        )
    }
}

/// System-wide circuit breaker metrics aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemCircuitBreakerMetrics {
    /// Metrics for individual circuit breakers by name
    pub circuit_breakers: HashMap<String, CircuitBreakerMetrics>,

    /// Timestamp of last metrics collection
    pub collected_at: chrono::DateTime<chrono::Utc>,
}

impl SystemCircuitBreakerMetrics {
    pub fn new() -> Self {
        Self {
            circuit_breakers: HashMap::new(),
            collected_at: chrono::Utc::now(),
        }
    }

    pub fn add_circuit_breaker(&mut self, name: String, metrics: CircuitBreakerMetrics) {
        self.circuit_breakers.insert(name, metrics);
        self.collected_at = chrono::Utc::now();
    }

    /// Get count of circuit breakers by state
    pub fn count_by_state(&self) -> HashMap<CircuitState, usize> {
        let mut counts = HashMap::new();
        for metrics in self.circuit_breakers.values() {
            *counts.entry(metrics.current_state).or_insert(0) += 1;
        }
        counts
    }

    /// Names of circuits that are open or failing
    pub fn unhealthy_circuits(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .circuit_breakers
            .iter()
            .filter(|(_, metrics)| !metrics.is_healthy())
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Calculate system-wide health score (0.0 to 1.0)
    pub fn health_score(&self) -> f64 {
        if self.circuit_breakers.is_empty() {
            return 1.0;
        }

        let healthy_count = self
            .circuit_breakers
            .values()
            .filter(|metrics| metrics.is_healthy())
            .count();

        healthy_count as f64 / self.circuit_breakers.len() as f64
    }

    pub fn total_calls(&self) -> u64 {
        self.circuit_breakers.values().map(|m| m.total_calls()).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.circuit_breakers
            .values()
            .map(|m| m.totals.error_count())
            .sum()
    }

    pub fn system_failure_rate(&self) -> f64 {
        let total_calls = self.total_calls();
        if total_calls == 0 {
            return 0.0;
        }

        self.total_errors() as f64 / total_calls as f64
    }

    pub fn format_summary(&self) -> String {
        let state_counts = self.count_by_state();
        let closed_count = state_counts.get(&CircuitState::Closed).unwrap_or(&0);
        let open_count = state_counts.get(&CircuitState::Open).unwrap_or(&0);
        let half_open_count = state_counts.get(&CircuitState::HalfOpen).unwrap_or(&0);

        format!(
            "Circuit Breakers: {} total | {} closed | {} open | {} half-open | Health: {:.1}% | System failure rate: {:.2}%",
            self.circuit_breakers.len(),
            closed_count,
            open_count,
            half_open_count,
            self.health_score() * 100.0,
            self.system_failure_rate() * 100.0
        )
    }
}

impl Default for SystemCircuitBreakerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
