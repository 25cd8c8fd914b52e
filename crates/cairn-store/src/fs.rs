use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use cairn_types::{CompressionHeaderId, ContentId, ContentInfo};
use tokio::io::AsyncReadExt;

use crate::blob::StoredBlob;
use crate::error::{StoreError, StoreResult};
use crate::traits::{ContentBackend, PutOutcome};

const MAGIC: &[u8; 4] = b"CRNB";
const VERSION: u32 = 1;

/// Size of the on-disk blob header: magic, version, compression, original length.
pub const BLOB_HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Filesystem content backend.
///
/// Each blob is one file at `<root>/<first two id chars>/<id>`, starting with
/// a fixed header so that `info` reads only [`BLOB_HEADER_LEN`] bytes.
/// Writes go to a temporary file in the shard directory, are fsynced, then
/// moved into place with a no-clobber rename; losing that race is reported
/// as [`PutOutcome::AlreadyPresent`] and the existing file is untouched.
#[derive(Debug, Clone)]
pub struct FsContentBackend {
    root: PathBuf,
}

impl FsContentBackend {
    /// Open (creating if needed) a backend rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        tracing::debug!(root = %root.display(), "opened filesystem content backend");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn shard_dir(&self, id: &ContentId) -> PathBuf {
        let name = id.to_string();
        self.root.join(&name[..2])
    }

    /// Path of the file holding `id`.
    pub fn blob_path(&self, id: &ContentId) -> PathBuf {
        self.shard_dir(id).join(id.to_string())
    }

    fn encode_header(blob: &StoredBlob) -> [u8; BLOB_HEADER_LEN] {
        let mut header = [0u8; BLOB_HEADER_LEN];
        header[0..4].copy_from_slice(MAGIC);
        header[4..8].copy_from_slice(&VERSION.to_be_bytes());
        header[8..12].copy_from_slice(&blob.compression.to_be_bytes());
        header[12..20].copy_from_slice(&blob.original_length.to_be_bytes());
        header
    }

    fn decode_header(
        id: &ContentId,
        header: &[u8],
    ) -> StoreResult<(CompressionHeaderId, u64)> {
        let corrupt = |reason: String| StoreError::CorruptBlob { id: *id, reason };
        if header.len() < BLOB_HEADER_LEN {
            return Err(corrupt(format!("blob file shorter than {BLOB_HEADER_LEN} bytes")));
        }
        if &header[0..4] != MAGIC {
            return Err(corrupt(format!("bad magic {:?}", &header[0..4])));
        }
        let version = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        if version != VERSION {
            return Err(corrupt(format!("unsupported blob version {version}")));
        }
        let compression =
            CompressionHeaderId::from_be_bytes([header[8], header[9], header[10], header[11]]);
        let mut len = [0u8; 8];
        len.copy_from_slice(&header[12..20]);
        Ok((compression, u64::from_be_bytes(len)))
    }
}

#[async_trait]
impl ContentBackend for FsContentBackend {
    async fn get(&self, id: &ContentId) -> StoreResult<Option<StoredBlob>> {
        let data = match tokio::fs::read(self.blob_path(id)).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let (compression, original_length) = Self::decode_header(id, &data)?;
        let body = Bytes::from(data).slice(BLOB_HEADER_LEN..);
        Ok(Some(StoredBlob {
            compression,
            original_length,
            body,
        }))
    }

    async fn info(&self, id: &ContentId) -> StoreResult<Option<ContentInfo>> {
        let path = self.blob_path(id);
        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file_len = file.metadata().await?.len();
        let mut header = [0u8; BLOB_HEADER_LEN];
        match file.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(StoreError::CorruptBlob {
                    id: *id,
                    reason: "truncated blob header".into(),
                })
            }
            Err(e) => return Err(e.into()),
        }
        let (compression, original_length) = Self::decode_header(id, &header)?;
        Ok(Some(ContentInfo {
            content_id: *id,
            original_length,
            stored_length: file_len - BLOB_HEADER_LEN as u64,
            compression_header: compression,
            location: Some(path.display().to_string()),
        }))
    }

    async fn contains(&self, id: &ContentId) -> StoreResult<bool> {
        Ok(tokio::fs::try_exists(self.blob_path(id)).await?)
    }

    async fn put_if_absent(&self, id: &ContentId, blob: StoredBlob) -> StoreResult<PutOutcome> {
        let shard = self.shard_dir(id);
        let target = self.blob_path(id);
        let header = Self::encode_header(&blob);

        let outcome = tokio::task::spawn_blocking(move || -> io::Result<PutOutcome> {
            std::fs::create_dir_all(&shard)?;
            let mut tmp = tempfile::Builder::new()
                .prefix(".tmp-")
                .tempfile_in(&shard)?;
            tmp.write_all(&header)?;
            tmp.write_all(&blob.body)?;
            tmp.as_file().sync_all()?;
            match tmp.persist_noclobber(&target) {
                Ok(_) => Ok(PutOutcome::Inserted),
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    Ok(PutOutcome::AlreadyPresent)
                }
                Err(e) => Err(e.error),
            }
        })
        .await
        .map_err(|e| StoreError::Io(io::Error::other(e)))??;

        Ok(outcome)
    }

    async fn delete(&self, id: &ContentId) -> StoreResult<bool> {
        match tokio::fs::remove_file(self.blob_path(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression;
    use cairn_types::ContentPrefix;
    use std::sync::Arc;

    fn id(byte: u8) -> ContentId {
        ContentId::new(ContentPrefix::Data, [byte; 32])
    }

    #[tokio::test]
    async fn put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsContentBackend::open(dir.path()).unwrap();
        let blob = StoredBlob::plain(b"on disk");
        assert_eq!(
            backend.put_if_absent(&id(1), blob.clone()).await.unwrap(),
            PutOutcome::Inserted
        );
        assert_eq!(backend.get(&id(1)).await.unwrap(), Some(blob));
        assert!(backend.blob_path(&id(1)).exists());
    }

    #[tokio::test]
    async fn sharded_layout() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsContentBackend::open(dir.path()).unwrap();
        let tagged = ContentId::new(ContentPrefix::from_char('k').unwrap(), [0xab; 32]);
        let path = backend.blob_path(&tagged);
        assert_eq!(path.parent().unwrap(), dir.path().join("ka"));
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), tagged.to_string());
    }

    #[tokio::test]
    async fn compressed_blob_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsContentBackend::open(dir.path()).unwrap();
        let payload = vec![b'q'; 50_000];
        let blob = StoredBlob::encode(&payload, compression::by_name("gzip")).unwrap();
        backend.put_if_absent(&id(2), blob).await.unwrap();

        let stored = backend.get(&id(2)).await.unwrap().unwrap();
        assert_eq!(stored.decode(&id(2)).unwrap(), payload);

        let info = backend.info(&id(2)).await.unwrap().unwrap();
        assert_eq!(info.original_length, 50_000);
        assert_eq!(info.stored_length, stored.stored_length());
        assert!(info.is_compressed());
        assert!(info.location.unwrap().ends_with(&id(2).to_string()));
    }

    #[tokio::test]
    async fn existing_file_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsContentBackend::open(dir.path()).unwrap();
        backend
            .put_if_absent(&id(3), StoredBlob::plain(b"first"))
            .await
            .unwrap();
        let outcome = backend
            .put_if_absent(&id(3), StoredBlob::plain(b"second"))
            .await
            .unwrap();
        assert_eq!(outcome, PutOutcome::AlreadyPresent);
        let stored = backend.get(&id(3)).await.unwrap().unwrap();
        assert_eq!(stored.body.as_ref(), b"first");
    }

    #[tokio::test]
    async fn missing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsContentBackend::open(dir.path()).unwrap();
        assert!(backend.get(&id(4)).await.unwrap().is_none());
        assert!(backend.info(&id(4)).await.unwrap().is_none());
        assert!(!backend.contains(&id(4)).await.unwrap());
        assert!(!backend.delete(&id(4)).await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsContentBackend::open(dir.path()).unwrap();
        backend
            .put_if_absent(&id(5), StoredBlob::plain(b"gone"))
            .await
            .unwrap();
        assert!(backend.delete(&id(5)).await.unwrap());
        assert!(!backend.contains(&id(5)).await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_header_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsContentBackend::open(dir.path()).unwrap();
        let path = backend.blob_path(&id(6));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"BADMAGIC-and-some-more-bytes").unwrap();

        assert!(matches!(
            backend.get(&id(6)).await,
            Err(StoreError::CorruptBlob { .. })
        ));
        assert!(matches!(
            backend.info(&id(6)).await,
            Err(StoreError::CorruptBlob { .. })
        ));
    }

    #[tokio::test]
    async fn truncated_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsContentBackend::open(dir.path()).unwrap();
        let path = backend.blob_path(&id(7));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"CRNB").unwrap();
        assert!(matches!(
            backend.info(&id(7)).await,
            Err(StoreError::CorruptBlob { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_puts_insert_once() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FsContentBackend::open(dir.path()).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let backend = Arc::clone(&backend);
                tokio::spawn(async move {
                    backend
                        .put_if_absent(&id(8), StoredBlob::plain(b"race"))
                        .await
                        .unwrap()
                })
            })
            .collect();
        let mut inserted = 0;
        for h in handles {
            if h.await.unwrap() == PutOutcome::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);

        // No temporary files are left behind.
        let shard = backend.blob_path(&id(8)).parent().unwrap().to_path_buf();
        let entries: Vec<_> = std::fs::read_dir(shard).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
