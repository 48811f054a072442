//! # Record Services
//!
//! Application services over the repository traits. They never know whether the repositories
//! they hold are decorated with circuit breakers; [`RecordServices::protected`] does that wiring.

pub mod record_command_service;
pub mod record_query_service;

pub use record_command_service::RecordCommandService;
pub use record_query_service::RecordQueryService;

use crate::execution::CommandExecutor;
use crate::repository::{
    RecordCommandRepository, RecordCommandRepositoryCircuitBreaker, RecordQueryRepository,
    RecordQueryRepositoryCircuitBreaker,
};
use std::sync::Arc;

/// Command and query services sharing one store
#[derive(Clone)]
pub struct RecordServices {
    pub commands: RecordCommandService,
    pub queries: RecordQueryService,
}

impl RecordServices {
    /// Services talking to the repositories directly
    pub fn unprotected(
        commands: Arc<dyn RecordCommandRepository>,
        queries: Arc<dyn RecordQueryRepository>,
    ) -> Self {
        Self {
            commands: RecordCommandService::new(commands),
            queries: RecordQueryService::new(queries),
        }
    }

    /// Services whose repositories run every call through `executor`
    pub fn protected(
        commands: Arc<dyn RecordCommandRepository>,
        queries: Arc<dyn RecordQueryRepository>,
        executor: CommandExecutor,
    ) -> Self {
        Self::unprotected(
            Arc::new(RecordCommandRepositoryCircuitBreaker::new(
                commands,
                executor.clone(),
            )),
            Arc::new(RecordQueryRepositoryCircuitBreaker::new(queries, executor)),
        )
    }
}
