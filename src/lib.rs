#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Records Core Rust
//!
//! Circuit-breaker protected record repositories built on a uniform command executor.
//!
//! ## Overview
//!
//! Every data-access operation (insert, update, delete, select-one, select-many) runs through
//! the [`execution::CommandExecutor`] under a stable, per-operation circuit name. The executor
//! runs the operation on its own tokio task, applies per-circuit admission control and a
//! failure-rate based circuit breaker, and hands the caller exactly one outcome: the value, the
//! store's own error, or a breaker-level failure.
//!
//! The decorated repositories implement the same traits as the undecorated ones, so services
//! and API layers do not know a breaker is present.
//!
//! ## Module Organization
//!
//! - [`resilience`] - Circuit breakers, rolling windows, metrics and the circuit registry
//! - [`execution`] - Command executor and the reply/channel plumbing
//! - [`repository`] - Repository traits, PostgreSQL and in-memory stores, breaker decorators
//! - [`services`] - Command and query services over the repository traits
//! - [`models`] - Record entities
//! - [`database`] - Pool management and schema bootstrap
//! - [`config`] - YAML configuration with environment overrides
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use records_core::config::ConfigManager;
//! use records_core::database::DatabaseConnection;
//! use records_core::execution::CommandExecutor;
//! use records_core::repository::{PgRecordCommandRepository, PgRecordQueryRepository};
//! use records_core::resilience::CircuitBreakerManager;
//! use records_core::services::RecordServices;
//! use std::sync::Arc;
//!
//! # async fn example() -> records_core::Result<()> {
//! let config = ConfigManager::load()?.config().clone();
//! let database = DatabaseConnection::connect(&config.database).await?;
//! database.ensure_schema().await?;
//!
//! let manager = Arc::new(CircuitBreakerManager::from_config(&config.circuit_breakers));
//! let services = RecordServices::protected(
//!     Arc::new(PgRecordCommandRepository::new(database.pool().clone())),
//!     Arc::new(PgRecordQueryRepository::new(
//!         database.pool().clone(),
//!         config.pagination.page_size,
//!     )),
//!     CommandExecutor::new(manager),
//! );
//!
//! let page = services.queries.get_records(Some(1)).await?;
//! println!("{} of {} records", page.records.len(), page.total);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod execution;
pub mod logging;
pub mod models;
pub mod repository;
pub mod resilience;
pub mod services;

pub use config::{ConfigManager, RecordsConfig};
pub use error::{ErrorKind, RecordsError, RepositoryError, Result};
pub use execution::{CommandError, CommandExecutor};
pub use models::{CreateRecord, Record, RecordPage, UpdateRecord};
pub use resilience::{BreakerError, CircuitBreakerManager, CircuitSettings, CircuitState};
