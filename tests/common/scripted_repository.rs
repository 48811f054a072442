use async_trait::async_trait;
use records_core::models::{CreateRecord, Record, UpdateRecord};
use records_core::repository::{
    InMemoryRecordRepository, RecordCommandRepository, RecordQueryRepository,
};
use records_core::RepositoryError;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory repository that fails or stalls on chosen calls
///
/// Calls are numbered from 1 across every operation, so a script like `fail_on(&[2, 4])`
/// fails the second and fourth call whatever they are.
#[derive(Debug)]
pub struct ScriptedRecordRepository {
    inner: InMemoryRecordRepository,
    calls: AtomicUsize,
    failing_calls: HashSet<usize>,
    delay: Option<Duration>,
}

impl ScriptedRecordRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryRecordRepository::new(10),
            calls: AtomicUsize::new(0),
            failing_calls: HashSet::new(),
            delay: None,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.inner = InMemoryRecordRepository::new(page_size);
        self
    }

    pub fn fail_on(mut self, calls: &[usize]) -> Self {
        self.failing_calls.extend(calls.iter().copied());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls that actually reached the store
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    async fn begin(&self) -> Result<(), RepositoryError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_calls.contains(&call) {
            return Err(RepositoryError::DatabaseError(format!(
                "scripted failure on call {call}"
            )));
        }
        Ok(())
    }
}

impl Default for ScriptedRecordRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordCommandRepository for ScriptedRecordRepository {
    async fn insert_record(&self, data: CreateRecord) -> Result<Record, RepositoryError> {
        self.begin().await?;
        self.inner.insert_record(data).await
    }

    async fn update_record(&self, data: UpdateRecord) -> Result<(), RepositoryError> {
        self.begin().await?;
        self.inner.update_record(data).await
    }

    async fn delete_record(&self, id: &str) -> Result<(), RepositoryError> {
        self.begin().await?;
        self.inner.delete_record(id).await
    }
}

#[async_trait]
impl RecordQueryRepository for ScriptedRecordRepository {
    async fn select_records(
        &self,
        page: Option<u32>,
    ) -> Result<(Vec<Record>, u64), RepositoryError> {
        self.begin().await?;
        self.inner.select_records(page).await
    }

    async fn select_record_by_id(&self, id: &str) -> Result<Record, RepositoryError> {
        self.begin().await?;
        self.inner.select_record_by_id(id).await
    }
}
