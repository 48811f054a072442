//! Write-side record service.

use crate::error::RepositoryError;
use crate::models::{CreateRecord, Record, UpdateRecord};
use crate::repository::RecordCommandRepository;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Record creation, update and deletion on top of any command repository
#[derive(Clone)]
pub struct RecordCommandService {
    repository: Arc<dyn RecordCommandRepository>,
}

impl RecordCommandService {
    pub fn new(repository: Arc<dyn RecordCommandRepository>) -> Self {
        Self { repository }
    }

    /// Create a record, generating an id when none was supplied
    pub async fn create_record(&self, mut data: CreateRecord) -> Result<Record, RepositoryError> {
        if data.id.trim().is_empty() {
            data.id = Uuid::new_v4().to_string();
            debug!(record_id = %data.id, "Generated record id");
        }

        self.repository.insert_record(data).await
    }

    pub async fn update_record(&self, data: UpdateRecord) -> Result<(), RepositoryError> {
        self.repository.update_record(data).await
    }

    pub async fn delete_record(&self, id: &str) -> Result<(), RepositoryError> {
        self.repository.delete_record(id).await
    }
}
