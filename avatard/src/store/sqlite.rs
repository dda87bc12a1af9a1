//! Chunked blob storage in SQLite
//!
//! Objects are keyed by (id, rendition). Content is split into fixed-size
//! chunks so a transfer reads one chunk at a time and an aborted transfer
//! stops touching the database.

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::stream;
use sqlx::SqlitePool;
use tracing::debug;

use super::{compute_identity, ObjectMetadata, ObjectStore, ResourceLocator, StoreError, StoredObject};
use crate::avatars::ByteStream;

/// Chunk size for stored content (255 KiB)
pub const CHUNK_SIZE: usize = 255 * 1024;

/// SQLite-backed object store
#[derive(Clone)]
pub struct SqliteObjectStore {
    pool: SqlitePool,
}

impl SqliteObjectStore {
    /// Create a new object store
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store content under (id, rendition), replacing any previous version
    pub async fn put(
        &self,
        id: &str,
        rendition: &str,
        data: &[u8],
        content_type: &str,
        modified: DateTime<Utc>,
    ) -> Result<ObjectMetadata, StoreError> {
        let identity = compute_identity(data);
        let mut tx = self.pool.begin().await?;

        // Chunks go with the file row (ON DELETE CASCADE)
        sqlx::query("DELETE FROM avatar_files WHERE id = ? AND rendition = ?")
            .bind(id)
            .bind(rendition)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO avatar_files (id, rendition, content_type, length, chunk_size, identity, upload_date)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(rendition)
        .bind(content_type)
        .bind(data.len() as i64)
        .bind(CHUNK_SIZE as i64)
        .bind(&identity)
        .bind(modified.timestamp_millis())
        .execute(&mut *tx)
        .await?;

        for (n, chunk) in data.chunks(CHUNK_SIZE).enumerate() {
            sqlx::query(
                "INSERT INTO avatar_chunks (file_id, rendition, n, data) VALUES (?, ?, ?, ?)",
            )
            .bind(id)
            .bind(rendition)
            .bind(n as i64)
            .bind(chunk)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Stored object {}/{} ({} bytes)", id, rendition, data.len());

        Ok(ObjectMetadata {
            modified,
            content_length: data.len() as u64,
            content_type: content_type.to_string(),
            identity,
        })
    }

    /// Delete an object and its chunks
    pub async fn delete(&self, id: &str, rendition: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM avatar_files WHERE id = ? AND rendition = ?")
            .bind(id)
            .bind(rendition)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn chunk_stream(&self, locator: &ResourceLocator, chunks: i64) -> ByteStream {
        let state = (
            self.pool.clone(),
            locator.id.clone(),
            locator.rendition().to_string(),
            0_i64,
        );

        ByteStream::new(stream::unfold(
            state,
            move |(pool, id, rendition, n)| async move {
                if n >= chunks {
                    return None;
                }

                let row: Result<Option<(Vec<u8>,)>, sqlx::Error> = sqlx::query_as(
                    "SELECT data FROM avatar_chunks WHERE file_id = ? AND rendition = ? AND n = ?",
                )
                .bind(&id)
                .bind(&rendition)
                .bind(n)
                .fetch_optional(&pool)
                .await;

                let item = match row {
                    Ok(Some((data,))) => Ok(Bytes::from(data)),
                    Ok(None) => Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("missing chunk {} of {}/{}", n, id, rendition),
                    )),
                    Err(e) => Err(io::Error::other(e)),
                };

                Some((item, (pool, id, rendition, n + 1)))
            },
        ))
    }
}

#[async_trait]
impl ObjectStore for SqliteObjectStore {
    async fn fetch(&self, locator: &ResourceLocator) -> Result<Option<StoredObject>, StoreError> {
        let row: Option<(String, i64, i64, i64, String, i64)> = sqlx::query_as(
            r#"
            SELECT f.content_type, f.length, f.chunk_size, f.upload_date, f.identity,
                   (SELECT COUNT(*) FROM avatar_chunks c
                    WHERE c.file_id = f.id AND c.rendition = f.rendition)
            FROM avatar_files f WHERE f.id = ? AND f.rendition = ?
            "#,
        )
        .bind(&locator.id)
        .bind(locator.rendition())
        .fetch_optional(&self.pool)
        .await?;

        let Some((content_type, length, chunk_size, upload_date, identity, chunks)) = row else {
            return Ok(None);
        };

        let modified = DateTime::from_timestamp_millis(upload_date)
            .ok_or_else(|| StoreError::Corrupt(locator.to_string()))?;
        let content_length =
            u64::try_from(length).map_err(|_| StoreError::Corrupt(locator.to_string()))?;

        let chunk_size = u64::try_from(chunk_size)
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| StoreError::Corrupt(locator.to_string()))?;

        // A partial chunk set would stream fewer bytes than Content-Length announces
        let expected = content_length.div_ceil(chunk_size);
        let stream = if u64::try_from(chunks).ok() != Some(expected) {
            debug!(
                "Object {} has {} of {} chunks, treating content as missing",
                locator, chunks, expected
            );
            None
        } else {
            Some(self.chunk_stream(locator, chunks))
        };

        Ok(Some(StoredObject {
            metadata: ObjectMetadata {
                modified,
                content_length,
                content_type,
                identity,
            },
            stream,
        }))
    }
}
