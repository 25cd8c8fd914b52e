use std::sync::Arc;

use cairn_crypto::ContentHasher;
use cairn_types::{CompressionHeaderId, ContentId, ContentInfo, ContentPrefix};

use crate::blob::StoredBlob;
use crate::compression;
use crate::error::{StoreError, StoreResult};
use crate::namespace;
use crate::prefetch::Prefetcher;
use crate::traits::{ContentBackend, PutOutcome};

/// How a successful write was satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// This write persisted a new body.
    Persisted,
    /// A body already existed under the computed address.
    Deduplicated,
}

/// Result of [`ContentManager::write_with_outcome`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WrittenContent {
    pub id: ContentId,
    pub outcome: WriteOutcome,
}

/// The content store.
///
/// Owns the read/write/dedup protocol over a [`ContentBackend`]. A write
/// moves through these states:
///
/// ```text
/// Validating ──► Denied | Rejected (bad compression)
///     │
///     ▼
/// Addressing ──► Dedup hit ──► Done
///     │
///     ▼
/// Persisting ──► Done
/// ```
///
/// The manager never compares the computed ID with anything a caller
/// expected; reconciliation belongs to the calling layer (see
/// [`crate::RepositoryHandle::write_declared`]).
pub struct ContentManager {
    backend: Arc<dyn ContentBackend>,
    hasher: ContentHasher,
    prefetcher: Prefetcher,
}

impl ContentManager {
    pub fn new(backend: Arc<dyn ContentBackend>, hasher: ContentHasher) -> Self {
        let prefetcher = Prefetcher::new(Arc::clone(&backend));
        Self {
            backend,
            hasher,
            prefetcher,
        }
    }

    /// Replace the prefetcher's batch limit.
    pub fn with_prefetch_limit(mut self, max_batch: usize) -> Self {
        self.prefetcher = Prefetcher::new(Arc::clone(&self.backend)).with_max_batch(max_batch);
        self
    }

    pub fn hasher(&self) -> &ContentHasher {
        &self.hasher
    }

    pub fn backend(&self) -> &Arc<dyn ContentBackend> {
        &self.backend
    }

    pub fn prefetcher(&self) -> &Prefetcher {
        &self.prefetcher
    }

    /// Compute the address a write would produce, without validation or I/O.
    pub fn address(
        &self,
        payload: &[u8],
        prefix: ContentPrefix,
        compression: CompressionHeaderId,
    ) -> ContentId {
        self.hasher.address(prefix, payload, compression)
    }

    /// Fetch and decode a body.
    #[tracing::instrument(skip_all, fields(id = %id))]
    pub async fn get(&self, id: &ContentId) -> StoreResult<Vec<u8>> {
        let blob = self
            .backend
            .get(id)
            .await?
            .ok_or(StoreError::NotFound(*id))?;
        blob.decode(id)
    }

    /// Metadata only; never touches the body.
    #[tracing::instrument(skip_all, fields(id = %id))]
    pub async fn info(&self, id: &ContentId) -> StoreResult<ContentInfo> {
        self.backend
            .info(id)
            .await?
            .ok_or(StoreError::NotFound(*id))
    }

    pub async fn contains(&self, id: &ContentId) -> StoreResult<bool> {
        self.backend.contains(id).await
    }

    /// Write a payload and return its canonical ID.
    pub async fn write(
        &self,
        payload: &[u8],
        prefix: ContentPrefix,
        compression: CompressionHeaderId,
    ) -> StoreResult<ContentId> {
        Ok(self.write_with_outcome(payload, prefix, compression).await?.id)
    }

    /// Write a payload, reporting whether it was persisted or deduplicated.
    #[tracing::instrument(
        skip_all,
        fields(len = payload.len(), prefix = %prefix, compression = %compression)
    )]
    pub async fn write_with_outcome(
        &self,
        payload: &[u8],
        prefix: ContentPrefix,
        compression: CompressionHeaderId,
    ) -> StoreResult<WrittenContent> {
        namespace::validate_write_prefix(prefix)?;
        let compressor = compression::resolve(compression)?;

        let id = self.hasher.address(prefix, payload, compression);

        // Fast path: skips compression on a dedup hit. Correctness under
        // concurrent writers comes from put_if_absent below.
        if self.backend.contains(&id).await? {
            tracing::debug!(id = %id, "dedup hit");
            return Ok(WrittenContent {
                id,
                outcome: WriteOutcome::Deduplicated,
            });
        }

        let blob = StoredBlob::encode(payload, compressor)?;
        let stored_length = blob.stored_length();
        let outcome = match self.backend.put_if_absent(&id, blob).await {
            Ok(PutOutcome::Inserted) => {
                tracing::info!(id = %id, stored_length, "persisted content");
                WriteOutcome::Persisted
            }
            Ok(PutOutcome::AlreadyPresent) => {
                tracing::debug!(id = %id, "dedup hit after racing writer");
                WriteOutcome::Deduplicated
            }
            Err(e) => {
                tracing::error!(id = %id, error = %e, "failed to persist content");
                return Err(e);
            }
        };

        Ok(WrittenContent { id, outcome })
    }

    /// Advisory residency check; see [`Prefetcher::prefetch`].
    pub async fn prefetch(&self, ids: &[ContentId], hint: Option<&str>) -> Vec<ContentId> {
        self.prefetcher.prefetch(ids, hint).await
    }
}

impl std::fmt::Debug for ContentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentManager")
            .field("hasher", &self.hasher)
            .field("prefetcher", &self.prefetcher)
            .finish_non_exhaustive()
    }
}
