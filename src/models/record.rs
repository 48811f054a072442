use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Record represents a single stored data entry
/// Maps to the `records` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Record {
    pub id: String,
    pub data: String,
    pub created_at: DateTime<Utc>,
}

/// New Record for creation (without generated fields)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRecord {
    pub id: String,
    pub data: String,
}

/// Replacement payload for an existing record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub id: String,
    pub data: String,
}

/// One listing page together with the total number of stored records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub total: u64,
}

impl Record {
    pub fn new(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
            created_at: Utc::now(),
        }
    }
}

impl From<CreateRecord> for Record {
    fn from(new_record: CreateRecord) -> Self {
        Record::new(new_record.id, new_record.data)
    }
}

impl RecordPage {
    pub fn into_parts(self) -> (Vec<Record>, u64) {
        (self.records, self.total)
    }
}

impl From<(Vec<Record>, u64)> for RecordPage {
    fn from((records, total): (Vec<Record>, u64)) -> Self {
        Self { records, total }
    }
}
