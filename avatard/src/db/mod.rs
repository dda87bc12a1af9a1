//! Database module - SQLite pool backing the directory and object store

#[cfg(test)]
pub mod test_utils;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

/// Database handle wrapping SQLite connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    /// If path is None, uses in-memory database (for testing)
    pub async fn new(path: Option<&str>) -> Result<Self> {
        let conn_str = match path {
            Some(p) => format!("sqlite:{}?mode=rwc", p),
            None => "sqlite::memory:".to_string(),
        };

        let options = SqliteConnectOptions::from_str(&conn_str)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        // Directory: users and communities
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                avatar TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS communities (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                avatar TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Object store: one row per (id, rendition), upload_date in epoch millis
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS avatar_files (
                id TEXT NOT NULL,
                rendition TEXT NOT NULL,
                content_type TEXT NOT NULL,
                length INTEGER NOT NULL,
                chunk_size INTEGER NOT NULL,
                identity TEXT NOT NULL,
                upload_date INTEGER NOT NULL,
                PRIMARY KEY (id, rendition)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS avatar_chunks (
                file_id TEXT NOT NULL,
                rendition TEXT NOT NULL,
                n INTEGER NOT NULL,
                data BLOB NOT NULL,
                PRIMARY KEY (file_id, rendition, n),
                FOREIGN KEY (file_id, rendition)
                    REFERENCES avatar_files(id, rendition) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations complete");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check if database is healthy
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
