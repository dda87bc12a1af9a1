//! In-memory object store

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::stream;
use parking_lot::{Mutex, RwLock};

use super::{compute_identity, ObjectMetadata, ObjectStore, ResourceLocator, StoreError, StoredObject};
use crate::avatars::{ByteStream, Release};

/// Streams are served in slices of this size
const SLICE_SIZE: usize = 4096;

struct Entry {
    metadata: ObjectMetadata,
    /// None simulates metadata without content
    content: Option<Bytes>,
}

/// Object store backed by a map, keyed by (id, rendition)
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(String, String), Entry>>,
    unavailable: AtomicBool,
    releases: Arc<Mutex<Vec<Release>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store content under (id, rendition)
    pub fn insert(
        &self,
        id: &str,
        rendition: &str,
        data: impl Into<Bytes>,
        content_type: &str,
        modified: DateTime<Utc>,
    ) -> ObjectMetadata {
        let data = data.into();
        let metadata = ObjectMetadata {
            modified,
            content_length: data.len() as u64,
            content_type: content_type.to_string(),
            identity: compute_identity(&data),
        };
        self.objects.write().insert(
            (id.to_string(), rendition.to_string()),
            Entry {
                metadata: metadata.clone(),
                content: Some(data),
            },
        );
        metadata
    }

    /// Store metadata whose content is missing
    pub fn insert_without_content(&self, id: &str, rendition: &str, metadata: ObjectMetadata) {
        self.objects.write().insert(
            (id.to_string(), rendition.to_string()),
            Entry {
                metadata,
                content: None,
            },
        );
    }

    /// Make every fetch fail, as an outage would
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Releases reported by every stream handed out so far
    pub fn releases(&self) -> Vec<Release> {
        self.releases.lock().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn fetch(&self, locator: &ResourceLocator) -> Result<Option<StoredObject>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }

        let objects = self.objects.read();
        let key = (locator.id.clone(), locator.rendition().to_string());
        let Some(entry) = objects.get(&key) else {
            return Ok(None);
        };

        let stream = entry.content.clone().map(|data| {
            let slices: Vec<io::Result<Bytes>> = (0..data.len())
                .step_by(SLICE_SIZE)
                .map(|start| Ok(data.slice(start..(start + SLICE_SIZE).min(data.len()))))
                .collect();
            let releases = self.releases.clone();
            ByteStream::new(stream::iter(slices)).on_release(move |how| releases.lock().push(how))
        });

        Ok(Some(StoredObject {
            metadata: entry.metadata.clone(),
            stream,
        }))
    }
}
