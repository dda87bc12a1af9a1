//! Binary object store
//!
//! The avatar endpoint reads content and metadata through the `ObjectStore`
//! trait. Two backends are provided:
//! - `SqliteObjectStore`: chunked blobs in the service database
//! - `MemoryObjectStore`: in-process map, used by tests and embedding

mod memory;
mod sqlite;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::avatars::ByteStream;

pub use memory::MemoryObjectStore;
pub use sqlite::{SqliteObjectStore, CHUNK_SIZE};

/// Rendition looked up when a request carries no format tag
pub const DEFAULT_RENDITION: &str = "avatar";

/// Resolved reference to one stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceLocator {
    pub id: String,
    pub format: Option<String>,
}

impl ResourceLocator {
    pub fn new(id: impl Into<String>, format: Option<&str>) -> Self {
        Self {
            id: id.into(),
            format: format.map(str::to_string),
        }
    }

    /// Rendition tag used as the second half of the storage key
    pub fn rendition(&self) -> &str {
        self.format.as_deref().unwrap_or(DEFAULT_RENDITION)
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.rendition())
    }
}

/// Snapshot of a stored object's attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Upload time, millisecond precision
    pub modified: DateTime<Utc>,
    pub content_length: u64,
    pub content_type: String,
    /// SHA-256 of the content
    pub identity: String,
}

/// Result of a successful fetch
#[derive(Debug)]
pub struct StoredObject {
    pub metadata: ObjectMetadata,
    /// None when the metadata exists but the content does not
    pub stream: Option<ByteStream>,
}

/// Object store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt object {0}")]
    Corrupt(String),

    #[error("object store unavailable")]
    Unavailable,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch metadata and a content stream, `Ok(None)` if nothing is stored
    async fn fetch(&self, locator: &ResourceLocator) -> Result<Option<StoredObject>, StoreError>;
}

/// Content identity: hex SHA-256 digest
pub fn compute_identity(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
