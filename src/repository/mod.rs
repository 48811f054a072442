//! # Record Repositories
//!
//! Command/query split data-access contracts for records, with a PostgreSQL implementation, an
//! in-memory implementation and circuit-breaker decorators that implement the very same traits.
//!
//! Callers only see `Arc<dyn RecordCommandRepository>` / `Arc<dyn RecordQueryRepository>`, so
//! whether a breaker sits in between is a wiring decision:
//!
//! ```rust
//! use records_core::execution::CommandExecutor;
//! use records_core::repository::{
//!     InMemoryRecordRepository, RecordQueryRepository, RecordQueryRepositoryCircuitBreaker,
//! };
//! use records_core::resilience::CircuitBreakerManager;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryRecordRepository::new(10));
//! let executor = CommandExecutor::new(Arc::new(CircuitBreakerManager::default()));
//! let queries: Arc<dyn RecordQueryRepository> =
//!     Arc::new(RecordQueryRepositoryCircuitBreaker::new(store, executor));
//! ```

pub mod circuit_breaker;
pub mod memory;
pub mod postgres;

use crate::error::RepositoryError;
use crate::models::{CreateRecord, Record, UpdateRecord};
use async_trait::async_trait;

pub use circuit_breaker::{RecordCommandRepositoryCircuitBreaker, RecordQueryRepositoryCircuitBreaker};
pub use memory::InMemoryRecordRepository;
pub use postgres::{PgRecordCommandRepository, PgRecordQueryRepository};

/// Write side of the record store
#[async_trait]
pub trait RecordCommandRepository: Send + Sync {
    /// Insert a new record, `DuplicateRecord` when the id is taken
    async fn insert_record(&self, data: CreateRecord) -> Result<Record, RepositoryError>;

    /// Replace the data of a record
    async fn update_record(&self, data: UpdateRecord) -> Result<(), RepositoryError>;

    /// Delete a record; deleting nothing is a `DatabaseError`
    async fn delete_record(&self, id: &str) -> Result<(), RepositoryError>;
}

/// Read side of the record store
#[async_trait]
pub trait RecordQueryRepository: Send + Sync {
    /// List records newest first, with the total count of stored records
    ///
    /// `page` is 1-based; `None` or `Some(0)` returns every record. An empty result is
    /// `MissingRecord`.
    async fn select_records(&self, page: Option<u32>)
        -> Result<(Vec<Record>, u64), RepositoryError>;

    /// Fetch one record, `MissingRecord` when absent
    async fn select_record_by_id(&self, id: &str) -> Result<Record, RepositoryError>;
}
