//! PostgreSQL-backed record repositories using runtime-checked `sqlx` queries.

use crate::constants::RECORDS_TABLE;
use crate::error::RepositoryError;
use crate::logging::log_error;
use crate::models::{CreateRecord, Record, UpdateRecord};
use crate::repository::{RecordCommandRepository, RecordQueryRepository};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

/// Map an insert failure, a unique violation becomes `DuplicateRecord`
fn insert_error(id: &str, err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RepositoryError::DuplicateRecord { id: id.to_string() };
        }
    }

    log_error("record_repository", "insert_record", &err.to_string(), Some(id));
    RepositoryError::DatabaseError(err.to_string())
}

/// Write side backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgRecordCommandRepository {
    pool: PgPool,
}

impl PgRecordCommandRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordCommandRepository for PgRecordCommandRepository {
    async fn insert_record(&self, data: CreateRecord) -> Result<Record, RepositoryError> {
        let sql = format!(
            "INSERT INTO {RECORDS_TABLE} (id, data) VALUES ($1, $2) RETURNING id, data, created_at"
        );

        sqlx::query_as::<_, Record>(&sql)
            .bind(&data.id)
            .bind(&data.data)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| insert_error(&data.id, e))
    }

    async fn update_record(&self, data: UpdateRecord) -> Result<(), RepositoryError> {
        let sql = format!("UPDATE {RECORDS_TABLE} SET data = $2 WHERE id = $1");

        sqlx::query(&sql)
            .bind(&data.id)
            .bind(&data.data)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn delete_record(&self, id: &str) -> Result<(), RepositoryError> {
        let sql = format!("DELETE FROM {RECORDS_TABLE} WHERE id = $1");

        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::DatabaseError(format!(
                "no record deleted for id {id}"
            )));
        }

        Ok(())
    }
}

/// Read side backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgRecordQueryRepository {
    pool: PgPool,
    page_size: u32,
}

impl PgRecordQueryRepository {
    pub fn new(pool: PgPool, page_size: u32) -> Self {
        Self { pool, page_size }
    }
}

#[async_trait]
impl RecordQueryRepository for PgRecordQueryRepository {
    async fn select_records(
        &self,
        page: Option<u32>,
    ) -> Result<(Vec<Record>, u64), RepositoryError> {
        let count_sql = format!("SELECT COUNT(*) FROM {RECORDS_TABLE}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let mut sql = format!("SELECT id, data, created_at FROM {RECORDS_TABLE} ORDER BY created_at DESC");
        if let Some(page) = page.filter(|p| *p > 0) {
            let limit = u64::from(self.page_size);
            let offset = limit * u64::from(page - 1);
            sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
        }

        let records = sqlx::query_as::<_, Record>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if records.is_empty() {
            return Err(RepositoryError::MissingRecord("no records found".to_string()));
        }

        debug!(
            page = ?page,
            returned = records.len(),
            total = total,
            "Selected records"
        );

        Ok((records, total.max(0) as u64))
    }

    async fn select_record_by_id(&self, id: &str) -> Result<Record, RepositoryError> {
        let sql = format!("SELECT id, data, created_at FROM {RECORDS_TABLE} WHERE id = $1");

        sqlx::query_as::<_, Record>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?
            .ok_or_else(|| RepositoryError::MissingRecord(id.to_string()))
    }
}
