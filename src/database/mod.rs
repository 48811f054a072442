//! # Database Operations
//!
//! PostgreSQL pool management and schema bootstrap for the record store.

pub mod connection;

pub use connection::DatabaseConnection;
