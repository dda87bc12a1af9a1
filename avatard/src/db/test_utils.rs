//! Shared test utilities for database operations

use sqlx::SqlitePool;

use super::Database;

/// Create an in-memory test database pool with the full schema
///
/// Goes through Database::new(None) so directory and store tests run
/// against the production migrations.
pub async fn test_pool() -> SqlitePool {
    let db = Database::new(None)
        .await
        .expect("Failed to create test database");
    db.pool().clone()
}
