use async_trait::async_trait;
use cairn_types::{ContentId, ContentInfo};

use crate::blob::StoredBlob;
use crate::error::StoreResult;

/// Result of [`ContentBackend::put_if_absent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    /// This call stored the body.
    Inserted,
    /// A body already existed; nothing was written.
    AlreadyPresent,
}

/// Blob persistence behind the content store.
///
/// All implementations must satisfy these invariants:
/// - `put_if_absent` is atomic: of any number of concurrent calls for one
///   ID, exactly one observes `Inserted` and the stored body is never
///   replaced afterwards.
/// - Reads never block on writes to unrelated IDs.
/// - `info` and `contains` never read or decode a body.
/// - All I/O errors are propagated, never silently ignored.
///
/// Every method is async; dropping the returned future cancels the
/// underlying I/O.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    /// Read a stored blob. `Ok(None)` if absent.
    async fn get(&self, id: &ContentId) -> StoreResult<Option<StoredBlob>>;

    /// Metadata for a stored blob. `Ok(None)` if absent.
    async fn info(&self, id: &ContentId) -> StoreResult<Option<ContentInfo>>;

    /// Check whether a blob exists.
    async fn contains(&self, id: &ContentId) -> StoreResult<bool>;

    /// Store `blob` under `id` unless a blob already exists there.
    async fn put_if_absent(&self, id: &ContentId, blob: StoredBlob) -> StoreResult<PutOutcome>;

    /// Delete a blob. Returns `true` if it existed.
    ///
    /// Intended for garbage collection only. The content store never calls it.
    async fn delete(&self, id: &ContentId) -> StoreResult<bool>;
}
