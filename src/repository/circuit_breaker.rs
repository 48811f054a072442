//! # Circuit Breaker Protected Record Repositories
//!
//! Wrap any record repository with circuit breaker protection. Every operation runs through
//! the [`CommandExecutor`] under its own stable circuit name, so a misbehaving store is cut off
//! per operation kind. Domain errors pass through untouched; breaker failures surface as
//! [`RepositoryError::CircuitBreaker`].

use crate::constants::circuits;
use crate::error::RepositoryError;
use crate::execution::{CommandError, CommandExecutor};
use crate::logging::log_repository_operation;
use crate::models::{CreateRecord, Record, RecordPage, UpdateRecord};
use crate::repository::{RecordCommandRepository, RecordQueryRepository};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

fn outcome_label<T>(result: &Result<T, RepositoryError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(error) if error.is_circuit_breaker() => "rejected",
        Err(_) => "failure",
    }
}

/// Write-side repository with circuit breaker protection
#[derive(Clone)]
pub struct RecordCommandRepositoryCircuitBreaker {
    /// Underlying repository
    inner: Arc<dyn RecordCommandRepository>,

    /// Executor owning the circuit registry
    executor: CommandExecutor,
}

impl std::fmt::Debug for RecordCommandRepositoryCircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCommandRepositoryCircuitBreaker")
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl RecordCommandRepositoryCircuitBreaker {
    pub fn new(inner: Arc<dyn RecordCommandRepository>, executor: CommandExecutor) -> Self {
        Self { inner, executor }
    }
}

#[async_trait]
impl RecordCommandRepository for RecordCommandRepositoryCircuitBreaker {
    async fn insert_record(&self, data: CreateRecord) -> Result<Record, RepositoryError> {
        let started = Instant::now();
        let record_id = data.id.clone();
        let inner = Arc::clone(&self.inner);

        let result = self
            .executor
            .run(circuits::INSERT_RECORD, move |reply| async move {
                reply.complete(inner.insert_record(data)).await
            })
            .await
            .map_err(CommandError::flatten);

        log_repository_operation(
            "insert_record",
            circuits::INSERT_RECORD,
            Some(&record_id),
            outcome_label(&result),
            started.elapsed().as_millis() as u64,
        );
        result
    }

    async fn update_record(&self, data: UpdateRecord) -> Result<(), RepositoryError> {
        let started = Instant::now();
        let record_id = data.id.clone();
        let inner = Arc::clone(&self.inner);

        let result = self
            .executor
            .run(circuits::UPDATE_RECORD, move |reply| async move {
                reply.complete(inner.update_record(data)).await
            })
            .await
            .map_err(CommandError::flatten);

        log_repository_operation(
            "update_record",
            circuits::UPDATE_RECORD,
            Some(&record_id),
            outcome_label(&result),
            started.elapsed().as_millis() as u64,
        );
        result
    }

    async fn delete_record(&self, id: &str) -> Result<(), RepositoryError> {
        let started = Instant::now();
        let record_id = id.to_string();
        let inner = Arc::clone(&self.inner);

        let result = self
            .executor
            .run(circuits::DELETE_RECORD, move |reply| async move {
                reply.complete(inner.delete_record(&record_id)).await
            })
            .await
            .map_err(CommandError::flatten);

        log_repository_operation(
            "delete_record",
            circuits::DELETE_RECORD,
            Some(id),
            outcome_label(&result),
            started.elapsed().as_millis() as u64,
        );
        result
    }
}

/// Read-side repository with circuit breaker protection
#[derive(Clone)]
pub struct RecordQueryRepositoryCircuitBreaker {
    /// Underlying repository
    inner: Arc<dyn RecordQueryRepository>,

    /// Executor owning the circuit registry
    executor: CommandExecutor,
}

impl std::fmt::Debug for RecordQueryRepositoryCircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordQueryRepositoryCircuitBreaker")
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl RecordQueryRepositoryCircuitBreaker {
    pub fn new(inner: Arc<dyn RecordQueryRepository>, executor: CommandExecutor) -> Self {
        Self { inner, executor }
    }
}

#[async_trait]
impl RecordQueryRepository for RecordQueryRepositoryCircuitBreaker {
    async fn select_records(
        &self,
        page: Option<u32>,
    ) -> Result<(Vec<Record>, u64), RepositoryError> {
        let started = Instant::now();
        let inner = Arc::clone(&self.inner);

        // Records and total travel together as one value
        let result = self
            .executor
            .run(circuits::SELECT_RECORDS, move |reply| async move {
                reply
                    .complete(async move { inner.select_records(page).await.map(RecordPage::from) })
                    .await
            })
            .await
            .map(RecordPage::into_parts)
            .map_err(CommandError::flatten);

        log_repository_operation(
            "select_records",
            circuits::SELECT_RECORDS,
            None,
            outcome_label(&result),
            started.elapsed().as_millis() as u64,
        );
        result
    }

    async fn select_record_by_id(&self, id: &str) -> Result<Record, RepositoryError> {
        let started = Instant::now();
        let record_id = id.to_string();
        let inner = Arc::clone(&self.inner);

        let result = self
            .executor
            .run(circuits::SELECT_RECORD_BY_ID, move |reply| async move {
                reply.complete(inner.select_record_by_id(&record_id)).await
            })
            .await
            .map_err(CommandError::flatten);

        log_repository_operation(
            "select_record_by_id",
            circuits::SELECT_RECORD_BY_ID,
            Some(id),
            outcome_label(&result),
            started.elapsed().as_millis() as u64,
        );
        result
    }
}
