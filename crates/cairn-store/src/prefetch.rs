use std::collections::HashSet;
use std::sync::Arc;

use cairn_types::ContentId;

use crate::traits::ContentBackend;

/// Default cap on distinct IDs examined per prefetch call.
pub const DEFAULT_MAX_BATCH: usize = 10_000;

/// Resolves which IDs of a batch are resident, without reading bodies.
///
/// Prefetch is a readahead hint, never authoritative: unknown IDs and IDs
/// whose existence check fails are left out of the result rather than
/// reported. A later `get` on an omitted ID may still succeed.
#[derive(Clone)]
pub struct Prefetcher {
    backend: Arc<dyn ContentBackend>,
    max_batch: usize,
}

impl Prefetcher {
    pub fn new(backend: Arc<dyn ContentBackend>) -> Self {
        Self {
            backend,
            max_batch: DEFAULT_MAX_BATCH,
        }
    }

    /// Limit the number of distinct IDs examined; the rest are omitted.
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    /// Return the resident subset of `ids`.
    ///
    /// The result has no duplicates and keeps first-seen input order.
    #[tracing::instrument(skip_all, fields(requested = ids.len(), hint = hint.unwrap_or("")))]
    pub async fn prefetch(&self, ids: &[ContentId], hint: Option<&str>) -> Vec<ContentId> {
        let mut seen = HashSet::with_capacity(ids.len().min(self.max_batch));
        let mut resident = Vec::new();

        for id in ids {
            if seen.len() >= self.max_batch {
                tracing::debug!(max_batch = self.max_batch, "prefetch batch truncated");
                break;
            }
            if !seen.insert(*id) {
                continue;
            }
            match self.backend.contains(id).await {
                Ok(true) => resident.push(*id),
                Ok(false) => {}
                Err(e) => tracing::warn!(id = %id, error = %e, "existence check failed during prefetch"),
            }
        }

        tracing::debug!(resident = resident.len(), "prefetch resolved");
        resident
    }
}

impl std::fmt::Debug for Prefetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prefetcher")
            .field("max_batch", &self.max_batch)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::StoredBlob;
    use crate::error::{StoreError, StoreResult};
    use crate::memory::InMemoryContentBackend;
    use crate::traits::PutOutcome;
    use async_trait::async_trait;
    use cairn_types::{ContentInfo, ContentPrefix};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn id(byte: u8) -> ContentId {
        ContentId::new(ContentPrefix::Data, [byte; 32])
    }

    async fn backend_with(bytes: &[u8]) -> Arc<InMemoryContentBackend> {
        let backend = Arc::new(InMemoryContentBackend::new());
        for b in bytes {
            backend
                .put_if_absent(&id(*b), StoredBlob::plain(&[*b]))
                .await
                .unwrap();
        }
        backend
    }

    /// Backend that fails existence checks for one ID and counts body reads.
    struct FlakyBackend {
        inner: InMemoryContentBackend,
        failing: ContentId,
        body_reads: AtomicUsize,
    }

    #[async_trait]
    impl ContentBackend for FlakyBackend {
        async fn get(&self, id: &ContentId) -> StoreResult<Option<StoredBlob>> {
            self.body_reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get(id).await
        }
        async fn info(&self, id: &ContentId) -> StoreResult<Option<ContentInfo>> {
            self.inner.info(id).await
        }
        async fn contains(&self, id: &ContentId) -> StoreResult<bool> {
            if *id == self.failing {
                return Err(StoreError::Io(std::io::Error::other("backend unavailable")));
            }
            self.inner.contains(id).await
        }
        async fn put_if_absent(&self, id: &ContentId, blob: StoredBlob) -> StoreResult<PutOutcome> {
            self.inner.put_if_absent(id, blob).await
        }
        async fn delete(&self, id: &ContentId) -> StoreResult<bool> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn omits_unknown_ids() {
        let prefetcher = Prefetcher::new(backend_with(&[1, 2]).await);
        let result = prefetcher.prefetch(&[id(1), id(9), id(2)], None).await;
        assert_eq!(result, vec![id(1), id(2)]);
    }

    #[tokio::test]
    async fn removes_duplicates_keeping_first_order() {
        let prefetcher = Prefetcher::new(backend_with(&[1, 2, 3]).await);
        let result = prefetcher
            .prefetch(&[id(3), id(1), id(3), id(2), id(1)], Some("contents"))
            .await;
        assert_eq!(result, vec![id(3), id(1), id(2)]);
    }

    #[tokio::test]
    async fn empty_input() {
        let prefetcher = Prefetcher::new(backend_with(&[1]).await);
        assert!(prefetcher.prefetch(&[], None).await.is_empty());
    }

    #[tokio::test]
    async fn batch_limit_truncates() {
        let prefetcher = Prefetcher::new(backend_with(&[1, 2, 3]).await).with_max_batch(2);
        assert_eq!(prefetcher.max_batch(), 2);
        let result = prefetcher.prefetch(&[id(1), id(1), id(2), id(3)], None).await;
        assert_eq!(result, vec![id(1), id(2)]);
    }

    #[tokio::test]
    async fn failed_checks_are_omitted_and_bodies_untouched() {
        let inner = InMemoryContentBackend::new();
        for b in [1u8, 2] {
            inner
                .put_if_absent(&id(b), StoredBlob::plain(&[b]))
                .await
                .unwrap();
        }
        let backend = Arc::new(FlakyBackend {
            inner,
            failing: id(1),
            body_reads: AtomicUsize::new(0),
        });
        let prefetcher = Prefetcher::new(backend.clone());
        let result = prefetcher.prefetch(&[id(1), id(2)], None).await;
        assert_eq!(result, vec![id(2)]);
        assert_eq!(backend.body_reads.load(Ordering::SeqCst), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn result_is_duplicate_free_subset(
            stored in proptest::collection::vec(0u8..16, 0..16),
            requested in proptest::collection::vec(0u8..32, 0..64),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let ids: Vec<ContentId> = requested.iter().map(|b| id(*b)).collect();
            let result = rt.block_on(async {
                let prefetcher = Prefetcher::new(backend_with(&stored).await);
                prefetcher.prefetch(&ids, None).await
            });

            let unique: HashSet<_> = result.iter().collect();
            prop_assert_eq!(unique.len(), result.len());
            for r in &result {
                prop_assert!(ids.contains(r));
                prop_assert!(stored.contains(&r.digest()[0]));
            }
        }
    }
}
