use records_core::execution::CommandExecutor;
use records_core::models::CreateRecord;
use records_core::repository::{
    RecordCommandRepository, RecordCommandRepositoryCircuitBreaker, RecordQueryRepository,
    RecordQueryRepositoryCircuitBreaker,
};
use records_core::resilience::{CircuitBreakerManager, CircuitSettings};
use std::sync::Arc;
use std::time::Duration;

/// Settings that never trip on their own within a test run
pub fn relaxed_settings() -> CircuitSettings {
    CircuitSettings {
        timeout: Duration::from_secs(2),
        max_concurrent_requests: 128,
        error_percent_threshold: 100,
        request_volume_threshold: 10_000,
        sleep_window: Duration::from_secs(30),
    }
}

/// Settings that trip after 5 calls at 50% errors and probe again after `sleep_window`
pub fn tripping_settings(sleep_window: Duration) -> CircuitSettings {
    CircuitSettings {
        timeout: Duration::from_secs(2),
        max_concurrent_requests: 16,
        error_percent_threshold: 50,
        request_volume_threshold: 5,
        sleep_window,
    }
}

/// Executor whose listed circuits are pre-configured with `settings`
pub fn executor_with(circuits: &[&str], settings: CircuitSettings) -> CommandExecutor {
    let manager = Arc::new(CircuitBreakerManager::default());
    for circuit in circuits {
        manager.configure(circuit, settings.clone());
    }
    CommandExecutor::new(manager)
}

pub fn decorate_commands<R>(
    inner: Arc<R>,
    executor: &CommandExecutor,
) -> RecordCommandRepositoryCircuitBreaker
where
    R: RecordCommandRepository + 'static,
{
    RecordCommandRepositoryCircuitBreaker::new(inner, executor.clone())
}

pub fn decorate_queries<R>(
    inner: Arc<R>,
    executor: &CommandExecutor,
) -> RecordQueryRepositoryCircuitBreaker
where
    R: RecordQueryRepository + 'static,
{
    RecordQueryRepositoryCircuitBreaker::new(inner, executor.clone())
}

pub fn new_record(id: &str) -> CreateRecord {
    CreateRecord {
        id: id.to_string(),
        data: format!("payload for {id}"),
    }
}
