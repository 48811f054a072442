//! # Record Models
//!
//! Entities moved between the repositories, the services and the command executor.

pub mod record;

pub use record::{CreateRecord, Record, RecordPage, UpdateRecord};
