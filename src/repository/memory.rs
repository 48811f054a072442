//! In-memory record store implementing both repository traits with PostgreSQL semantics.

use crate::error::RepositoryError;
use crate::models::{CreateRecord, Record, UpdateRecord};
use crate::repository::{RecordCommandRepository, RecordQueryRepository};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Store {
    records: HashMap<String, (u64, Record)>,
    next_sequence: u64,
}

/// Record store kept in process memory
#[derive(Debug)]
pub struct InMemoryRecordRepository {
    store: RwLock<Store>,
    page_size: u32,
}

impl InMemoryRecordRepository {
    pub fn new(page_size: u32) -> Self {
        Self {
            store: RwLock::new(Store::default()),
            page_size: page_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.store.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordCommandRepository for InMemoryRecordRepository {
    async fn insert_record(&self, data: CreateRecord) -> Result<Record, RepositoryError> {
        let mut store = self.store.write();
        if store.records.contains_key(&data.id) {
            return Err(RepositoryError::DuplicateRecord { id: data.id });
        }

        let record = Record::from(data);
        let sequence = store.next_sequence;
        store.next_sequence += 1;
        store
            .records
            .insert(record.id.clone(), (sequence, record.clone()));

        Ok(record)
    }

    async fn update_record(&self, data: UpdateRecord) -> Result<(), RepositoryError> {
        // Like `UPDATE ... WHERE id = $1`, touching nothing is not an error
        if let Some((_, record)) = self.store.write().records.get_mut(&data.id) {
            record.data = data.data;
        }
        Ok(())
    }

    async fn delete_record(&self, id: &str) -> Result<(), RepositoryError> {
        match self.store.write().records.remove(id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::DatabaseError(format!(
                "no record deleted for id {id}"
            ))),
        }
    }
}

#[async_trait]
impl RecordQueryRepository for InMemoryRecordRepository {
    async fn select_records(
        &self,
        page: Option<u32>,
    ) -> Result<(Vec<Record>, u64), RepositoryError> {
        let store = self.store.read();
        let total = store.records.len() as u64;

        let mut ordered: Vec<&(u64, Record)> = store.records.values().collect();
        ordered.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a))
        });

        let records: Vec<Record> = match page.filter(|p| *p > 0) {
            Some(page) => {
                let limit = self.page_size as usize;
                let offset = limit.saturating_mul(page as usize - 1);
                ordered
                    .into_iter()
                    .skip(offset)
                    .take(limit)
                    .map(|(_, record)| record.clone())
                    .collect()
            }
            None => ordered.into_iter().map(|(_, record)| record.clone()).collect(),
        };

        if records.is_empty() {
            return Err(RepositoryError::MissingRecord("no records found".to_string()));
        }

        Ok((records, total))
    }

    async fn select_record_by_id(&self, id: &str) -> Result<Record, RepositoryError> {
        self.store
            .read()
            .records
            .get(id)
            .map(|(_, record)| record.clone())
            .ok_or_else(|| RepositoryError::MissingRecord(id.to_string()))
    }
}
