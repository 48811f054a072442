//! # Error Types
//!
//! Closed error taxonomy for the record layer. Domain errors come from the data-access layer and
//! pass through the circuit breaker untouched; breaker-level failures get their own kind so
//! callers can tell them apart by [`ErrorKind`] rather than by message text.

use crate::config::ConfigurationError;
use crate::resilience::BreakerError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-checkable classification of a [`RepositoryError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DuplicateRecord,
    MissingRecord,
    DatabaseError,
    CircuitBreaker,
}

impl ErrorKind {
    /// Stable error code surfaced to API consumers
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::DuplicateRecord => "DUPLICATE_RECORD",
            ErrorKind::MissingRecord => "MISSING_RECORD",
            ErrorKind::DatabaseError => "DATABASE_ERROR",
            ErrorKind::CircuitBreaker => "SERVICE_UNAVAILABLE",
        }
    }

    /// HTTP status an API boundary should answer with for this kind
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::DuplicateRecord => 409,
            ErrorKind::MissingRecord => 404,
            ErrorKind::DatabaseError => 500,
            ErrorKind::CircuitBreaker => 503,
        }
    }

    /// True for errors produced by the data-access layer itself
    pub fn is_domain(&self) -> bool {
        !matches!(self, ErrorKind::CircuitBreaker)
    }
}

/// Errors returned by record repositories, decorated or not
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepositoryError {
    #[error("Record already exists: {id}")]
    DuplicateRecord { id: String },

    #[error("Record not found: {0}")]
    MissingRecord(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error(transparent)]
    CircuitBreaker(#[from] BreakerError),
}

impl RepositoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::DuplicateRecord { .. } => ErrorKind::DuplicateRecord,
            RepositoryError::MissingRecord(_) => ErrorKind::MissingRecord,
            RepositoryError::DatabaseError(_) => ErrorKind::DatabaseError,
            RepositoryError::CircuitBreaker(_) => ErrorKind::CircuitBreaker,
        }
    }

    pub fn is_circuit_breaker(&self) -> bool {
        self.kind() == ErrorKind::CircuitBreaker
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::MissingRecord("no rows returned".to_string()),
            other => RepositoryError::DatabaseError(other.to_string()),
        }
    }
}

/// Crate-level error for wiring and bootstrap code
#[derive(Debug, Error)]
pub enum RecordsError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, RecordsError>;
