use bytes::Bytes;
use cairn_types::{CompressionHeaderId, ContentId, ContentInfo};

use crate::compression::{self, Compressor};
use crate::error::{StoreError, StoreResult};

/// Length of the frame header preceding a compressed stream.
pub const FRAME_HEADER_LEN: usize = 4;

/// A body as handed to, and returned by, a storage backend.
///
/// Compressed bodies are framed as the 4-byte big-endian compression header
/// followed by the compressed stream, so the body alone says how to decode
/// it. Uncompressed bodies are stored verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    /// Compression actually applied to `body`.
    pub compression: CompressionHeaderId,
    /// Length of the payload before compression.
    pub original_length: u64,
    pub body: Bytes,
}

impl StoredBlob {
    /// An uncompressed blob.
    pub fn plain(payload: &[u8]) -> Self {
        Self {
            compression: CompressionHeaderId::NONE,
            original_length: payload.len() as u64,
            body: Bytes::copy_from_slice(payload),
        }
    }

    /// Encode a payload for storage.
    ///
    /// Falls back to an uncompressed body when compression does not make it
    /// smaller, in which case `compression` is `NONE`.
    pub fn encode(payload: &[u8], compressor: Option<&Compressor>) -> StoreResult<Self> {
        let Some(compressor) = compressor else {
            return Ok(Self::plain(payload));
        };

        let compressed = compressor.compress(payload)?;
        if compressed.len() + FRAME_HEADER_LEN >= payload.len() {
            return Ok(Self::plain(payload));
        }

        let mut body = Vec::with_capacity(FRAME_HEADER_LEN + compressed.len());
        body.extend_from_slice(&compressor.header_id.to_be_bytes());
        body.extend_from_slice(&compressed);
        Ok(Self {
            compression: compressor.header_id,
            original_length: payload.len() as u64,
            body: body.into(),
        })
    }

    /// Reconstitute the original payload.
    ///
    /// `id` is used only for error reporting.
    pub fn decode(&self, id: &ContentId) -> StoreResult<Vec<u8>> {
        let payload = if self.compression.is_none() {
            self.body.to_vec()
        } else {
            let corrupt = |reason: String| StoreError::CorruptBlob { id: *id, reason };
            if self.body.len() < FRAME_HEADER_LEN {
                return Err(corrupt("compressed body shorter than frame header".into()));
            }
            let (frame, stream) = self.body.split_at(FRAME_HEADER_LEN);
            let framed = CompressionHeaderId::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]);
            if framed != self.compression {
                return Err(corrupt(format!(
                    "frame header {framed} disagrees with recorded {}",
                    self.compression
                )));
            }
            let compressor = compression::by_header_id(framed)
                .ok_or_else(|| corrupt(format!("no compressor registered for {framed}")))?;
            compressor.decompress(stream, self.original_length)?
        };

        if payload.len() as u64 != self.original_length {
            return Err(StoreError::CorruptBlob {
                id: *id,
                reason: format!(
                    "decoded {} bytes, expected {}",
                    payload.len(),
                    self.original_length
                ),
            });
        }
        Ok(payload)
    }

    /// Length of the stored body.
    pub fn stored_length(&self) -> u64 {
        self.body.len() as u64
    }

    /// Metadata for this blob under `id`.
    pub fn info(&self, id: ContentId, location: Option<String>) -> ContentInfo {
        ContentInfo {
            content_id: id,
            original_length: self.original_length,
            stored_length: self.stored_length(),
            compression_header: self.compression,
            location,
        }
    }
}
