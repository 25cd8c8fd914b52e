use std::sync::Arc;

use async_trait::async_trait;
use cairn_types::{CompressionHeaderId, ContentId, ContentInfo, ContentPrefix};

use crate::error::{StoreError, StoreResult};
use crate::manager::ContentManager;

/// Read side of a repository, as reachable from a remote connection.
#[async_trait]
pub trait ContentReader: Send + Sync {
    async fn get(&self, id: &ContentId) -> StoreResult<Vec<u8>>;
    async fn info(&self, id: &ContentId) -> StoreResult<ContentInfo>;
    async fn prefetch(&self, ids: &[ContentId], hint: Option<&str>) -> Vec<ContentId>;
}

#[async_trait]
impl ContentReader for ContentManager {
    async fn get(&self, id: &ContentId) -> StoreResult<Vec<u8>> {
        ContentManager::get(self, id).await
    }

    async fn info(&self, id: &ContentId) -> StoreResult<ContentInfo> {
        ContentManager::info(self, id).await
    }

    async fn prefetch(&self, ids: &[ContentId], hint: Option<&str>) -> Vec<ContentId> {
        ContentManager::prefetch(self, ids, hint).await
    }
}

/// A repository opened with direct access to its content manager.
#[derive(Debug, Clone)]
pub struct DirectRepository {
    manager: Arc<ContentManager>,
}

impl DirectRepository {
    pub fn new(manager: Arc<ContentManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<ContentManager> {
        &self.manager
    }
}

/// A repository reached through a read-only connection.
#[derive(Clone)]
pub struct RemoteRepository {
    reader: Arc<dyn ContentReader>,
}

impl RemoteRepository {
    pub fn new(reader: Arc<dyn ContentReader>) -> Self {
        Self { reader }
    }
}

impl std::fmt::Debug for RemoteRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteRepository").finish_non_exhaustive()
    }
}

/// The repository capability a request is served against.
///
/// Only a direct handle can write. Every write entry point checks the
/// capability before doing any work, so a remote handle never hashes,
/// compresses or touches storage on the write path.
#[derive(Debug, Clone)]
pub enum RepositoryHandle {
    Direct(DirectRepository),
    Remote(RemoteRepository),
}

impl RepositoryHandle {
    pub fn direct(manager: Arc<ContentManager>) -> Self {
        Self::Direct(DirectRepository::new(manager))
    }

    pub fn remote(reader: Arc<dyn ContentReader>) -> Self {
        Self::Remote(RemoteRepository::new(reader))
    }

    pub fn supports_write(&self) -> bool {
        matches!(self, Self::Direct(_))
    }

    fn reader(&self) -> &dyn ContentReader {
        match self {
            Self::Direct(direct) => direct.manager.as_ref() as &dyn ContentReader,
            Self::Remote(remote) => remote.reader.as_ref(),
        }
    }

    fn writer(&self) -> StoreResult<&ContentManager> {
        match self {
            Self::Direct(direct) => Ok(direct.manager.as_ref()),
            Self::Remote(_) => {
                tracing::warn!("write rejected on read-only repository handle");
                Err(StoreError::NotWritable)
            }
        }
    }

    pub async fn get(&self, id: &ContentId) -> StoreResult<Vec<u8>> {
        self.reader().get(id).await
    }

    pub async fn info(&self, id: &ContentId) -> StoreResult<ContentInfo> {
        self.reader().info(id).await
    }

    pub async fn prefetch(&self, ids: &[ContentId], hint: Option<&str>) -> Vec<ContentId> {
        self.reader().prefetch(ids, hint).await
    }

    /// Write a payload under `prefix` and return its canonical ID.
    pub async fn write(
        &self,
        payload: &[u8],
        prefix: ContentPrefix,
        compression: CompressionHeaderId,
    ) -> StoreResult<ContentId> {
        self.writer()?.write(payload, prefix, compression).await
    }

    /// Write a payload a client has already addressed.
    ///
    /// The declared ID's prefix selects the namespace. After the store
    /// computes the canonical ID the two are compared; on disagreement the
    /// write fails with [`StoreError::MismatchedIdentifier`]. Any blob
    /// persisted under the computed ID stays where it is, unreferenced,
    /// until garbage collection removes it.
    #[tracing::instrument(skip_all, fields(declared = %declared))]
    pub async fn write_declared(
        &self,
        declared: &ContentId,
        payload: &[u8],
        compression: CompressionHeaderId,
    ) -> StoreResult<ContentId> {
        let manager = self.writer()?;
        let actual = manager.write(payload, declared.prefix(), compression).await?;
        if actual != *declared {
            tracing::warn!(declared = %declared, actual = %actual, "declared content id mismatch");
            return Err(StoreError::MismatchedIdentifier {
                declared: *declared,
                actual,
            });
        }
        Ok(actual)
    }
}
