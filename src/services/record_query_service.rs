//! Read-side record service.

use crate::error::RepositoryError;
use crate::models::{Record, RecordPage};
use crate::repository::RecordQueryRepository;
use std::sync::Arc;

/// Record lookups on top of any query repository
#[derive(Clone)]
pub struct RecordQueryService {
    repository: Arc<dyn RecordQueryRepository>,
}

impl RecordQueryService {
    pub fn new(repository: Arc<dyn RecordQueryRepository>) -> Self {
        Self { repository }
    }

    /// One page of records newest first, or everything when `page` is `None`
    pub async fn get_records(&self, page: Option<u32>) -> Result<RecordPage, RepositoryError> {
        self.repository
            .select_records(page)
            .await
            .map(RecordPage::from)
    }

    pub async fn get_record_by_id(&self, id: &str) -> Result<Record, RepositoryError> {
        self.repository.select_record_by_id(id).await
    }
}
