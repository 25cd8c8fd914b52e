use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use cairn_types::{ContentId, ContentInfo};

use crate::blob::StoredBlob;
use crate::error::StoreResult;
use crate::traits::{ContentBackend, PutOutcome};

/// In-memory, HashMap-based content backend.
///
/// Intended for tests and embedding. Blobs are held behind a `RwLock`; the
/// write lock spans the existence check and the insert, which is what makes
/// `put_if_absent` atomic. Bodies are `Bytes`, so reads clone cheaply.
pub struct InMemoryContentBackend {
    blobs: RwLock<HashMap<ContentId, StoredBlob>>,
    inserts: AtomicU64,
}

impl InMemoryContentBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            inserts: AtomicU64::new(0),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Number of successful inserts since creation.
    ///
    /// Dedup hits do not count, so this is the number of effective persists.
    pub fn insert_count(&self) -> u64 {
        self.inserts.load(Ordering::SeqCst)
    }

}

impl Default for InMemoryContentBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentBackend for InMemoryContentBackend {
    async fn get(&self, id: &ContentId) -> StoreResult<Option<StoredBlob>> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.get(id).cloned())
    }

    async fn info(&self, id: &ContentId) -> StoreResult<Option<ContentInfo>> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.get(id).map(|blob| blob.info(*id, Some("memory".into()))))
    }

    async fn contains(&self, id: &ContentId) -> StoreResult<bool> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }

    async fn put_if_absent(&self, id: &ContentId, blob: StoredBlob) -> StoreResult<PutOutcome> {
        let mut map = self.blobs.write().expect("lock poisoned");
        if map.contains_key(id) {
            return Ok(PutOutcome::AlreadyPresent);
        }
        map.insert(*id, blob);
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(PutOutcome::Inserted)
    }

    async fn delete(&self, id: &ContentId) -> StoreResult<bool> {
        let mut map = self.blobs.write().expect("lock poisoned");
        Ok(map.remove(id).is_some())
    }
}

impl std::fmt::Debug for InMemoryContentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentBackend")
            .field("blob_count", &self.len())
            .finish()
    }
}
