use crate::config::DatabaseConfig;
use crate::constants::RECORDS_TABLE;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

/// Owns the PostgreSQL pool shared by the record repositories
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    /// Build a pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await?;

        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "💾 Database pool established"
        );

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 as health")
            .fetch_one(&self.pool)
            .await?;

        let health: i32 = row.get("health");
        Ok(health == 1)
    }

    /// Create the records table when it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        let create_table = format!(
            "CREATE TABLE IF NOT EXISTS {RECORDS_TABLE} (
                id VARCHAR(255) PRIMARY KEY,
                data TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"
        );
        let create_index = format!(
            "CREATE INDEX IF NOT EXISTS idx_{RECORDS_TABLE}_created_at ON {RECORDS_TABLE} (created_at DESC)"
        );

        sqlx::query(&create_table).execute(&self.pool).await?;
        sqlx::query(&create_index).execute(&self.pool).await?;

        info!(table = RECORDS_TABLE, "Records schema ensured");
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
