//! # Circuit Breaker Manager
//!
//! Process-wide registry of named circuits. Circuits are created lazily on first use and live
//! for the lifetime of the manager; reconfiguring a name replaces its settings but keeps its
//! state and statistics.

use crate::config::CircuitBreakerConfig;
use crate::resilience::{
    CircuitBreaker, CircuitBreakerMetrics, CircuitSettings, CircuitState,
    SystemCircuitBreakerMetrics,
};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Manager for the circuit breakers guarding the record operations
#[derive(Debug)]
pub struct CircuitBreakerManager {
    /// Collection of circuit breakers by circuit name
    circuit_breakers: DashMap<String, Arc<CircuitBreaker>>,

    /// Configuration
    config: CircuitBreakerConfig,
}

impl CircuitBreakerManager {
    /// Create new circuit breaker manager from configuration
    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        info!(
            enabled = config.enabled,
            component_configs = config.component_configs.len(),
            "Initializing circuit breaker manager"
        );

        Self {
            circuit_breakers: DashMap::new(),
            config: config.clone(),
        }
    }

    /// Whether breaker accounting is applied at all
    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get or create circuit breaker for a circuit name
    pub fn get_circuit_breaker(&self, circuit_name: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.circuit_breakers.get(circuit_name) {
            return Arc::clone(breaker.value());
        }

        let entry = self
            .circuit_breakers
            .entry(circuit_name.to_string())
            .or_insert_with(|| {
                let settings = self.config.config_for_component(circuit_name).to_settings();
                Arc::new(CircuitBreaker::new(circuit_name.to_string(), settings))
            });
        let breaker = Arc::clone(entry.value());
        drop(entry);

        info!(
            circuit = circuit_name,
            total_circuit_breakers = self.circuit_breakers.len(),
            "Created new circuit breaker"
        );

        breaker
    }

    /// Register or reconfigure a circuit; the last call for a name wins
    pub fn configure(&self, circuit_name: &str, settings: CircuitSettings) -> Arc<CircuitBreaker> {
        match self.circuit_breakers.entry(circuit_name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                let breaker = Arc::clone(entry.get());
                drop(entry);
                breaker.update_settings(settings);
                info!(circuit = circuit_name, "⚙️ Updated circuit breaker configuration");
                breaker
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let breaker = Arc::new(CircuitBreaker::new(circuit_name.to_string(), settings));
                entry.insert(Arc::clone(&breaker));
                breaker
            }
        }
    }

    /// Get all circuit breaker names, sorted
    pub fn list_components(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .circuit_breakers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort_unstable();
        names
    }

    /// Get metrics for a specific circuit breaker
    pub fn get_component_metrics(&self, circuit_name: &str) -> Option<CircuitBreakerMetrics> {
        self.circuit_breakers
            .get(circuit_name)
            .map(|breaker| breaker.metrics())
    }

    /// Get system-wide circuit breaker metrics
    pub fn get_system_metrics(&self) -> SystemCircuitBreakerMetrics {
        let mut system_metrics = SystemCircuitBreakerMetrics::new();

        for entry in self.circuit_breakers.iter() {
            system_metrics.add_circuit_breaker(entry.key().clone(), entry.value().metrics());
        }

        system_metrics
    }

    /// Force open all circuit breakers (emergency stop)
    pub fn force_open_all(&self) {
        warn!("🚨 Forcing all circuit breakers open (emergency stop)");

        for entry in self.circuit_breakers.iter() {
            entry.value().force_open();
        }
    }

    /// Force close all circuit breakers (emergency recovery)
    pub fn force_close_all(&self) {
        warn!("🚨 Forcing all circuit breakers closed (emergency recovery)");

        for entry in self.circuit_breakers.iter() {
            entry.value().force_closed();
        }
    }

    /// Get count of circuit breakers by state
    pub fn get_state_summary(&self) -> HashMap<CircuitState, usize> {
        self.get_system_metrics().count_by_state()
    }

    /// Check overall system health based on circuit breaker states
    pub fn system_health_score(&self) -> f64 {
        self.get_system_metrics().health_score()
    }
}

impl Default for CircuitBreakerManager {
    fn default() -> Self {
        Self::from_config(&CircuitBreakerConfig::default())
    }
}
