//! Database module
//!
//! SQLite access for question banks, session rows, and end-of-session
//! results. Touched only at session boundaries; live session state never
//! hits the store.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

pub mod banks;
pub mod results;
pub mod sessions;

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// In-memory database for tests
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        let schema_sql = include_str!("schema.sql");
        sqlx::raw_sql(schema_sql).execute(&self.pool).await?;
        tracing::info!("Database schema initialized");
        Ok(())
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check if the database is healthy
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Get the current schema version
    pub async fn schema_version(&self) -> Result<String> {
        let row: (String,) =
            sqlx::query_as("SELECT value FROM server_metadata WHERE key = 'schema_version'")
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0)
    }

    /// Close the database connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_initializes() {
        let db = Database::in_memory().await.unwrap();
        db.init_schema().await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), "1");
        db.health_check().await.unwrap();
    }
}
