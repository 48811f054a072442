//! # Command Execution
//!
//! Breaker-protected execution of fallible operations. A caller hands the executor a circuit
//! name and a closure; the closure runs on its own task and reports through a
//! [`CommandReply`], while the caller waits for exactly one of success, domain error or
//! breaker failure.
//!
//! ```rust
//! use records_core::execution::{CommandError, CommandExecutor};
//! use records_core::resilience::CircuitBreakerManager;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let executor = CommandExecutor::new(Arc::new(CircuitBreakerManager::default()));
//!
//! let result: Result<u32, CommandError<String>> = executor
//!     .run("select_records", |reply| async move { reply.succeed(23) })
//!     .await;
//! assert_eq!(result.unwrap(), 23);
//! # }
//! ```

pub mod command;
pub mod executor;

pub use command::{command_channels, CommandError, CommandReceivers, CommandReply, CommandSenders};
pub use executor::CommandExecutor;
