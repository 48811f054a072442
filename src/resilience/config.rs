//! # Circuit Settings
//!
//! Runtime settings for a single named circuit. The YAML-facing shape lives in
//! `crate::config::CircuitBreakerComponentConfig`, which converts into this type.

use crate::constants::circuit_defaults;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings applied to one circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitSettings {
    /// Maximum time the caller waits for an outcome before a breaker-level timeout
    pub timeout: Duration,

    /// Admission limit for in-flight invocations
    pub max_concurrent_requests: usize,

    /// Error percentage (0-100) over the rolling window that trips the circuit
    pub error_percent_threshold: u8,

    /// Minimum requests in the rolling window before the error percentage is evaluated
    pub request_volume_threshold: u64,

    /// Time an open circuit waits before admitting a half-open probe
    pub sleep_window: Duration,
}

impl CircuitSettings {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout.is_zero() {
            return Err("timeout must be greater than 0".to_string());
        }

        if self.timeout > Duration::from_secs(300) {
            return Err("timeout should not exceed 300 seconds".to_string());
        }

        if self.max_concurrent_requests == 0 {
            return Err("max_concurrent_requests must be greater than 0".to_string());
        }

        if self.error_percent_threshold == 0 || self.error_percent_threshold > 100 {
            return Err("error_percent_threshold must be between 1 and 100".to_string());
        }

        if self.request_volume_threshold == 0 {
            return Err("request_volume_threshold must be greater than 0".to_string());
        }

        if self.sleep_window.is_zero() {
            return Err("sleep_window must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(circuit_defaults::TIMEOUT_MS),
            max_concurrent_requests: circuit_defaults::MAX_CONCURRENT_REQUESTS,
            error_percent_threshold: circuit_defaults::ERROR_PERCENT_THRESHOLD,
            request_volume_threshold: circuit_defaults::REQUEST_VOLUME_THRESHOLD,
            sleep_window: Duration::from_millis(circuit_defaults::SLEEP_WINDOW_MS),
        }
    }
}
