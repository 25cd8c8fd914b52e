use cairn_types::{CompressionHeaderId, ContentId, ContentPrefix};

/// Coarse classification of store errors.
///
/// Callers (the HTTP layer in particular) map on this instead of on
/// individual variants so that new backend failures classify as
/// [`ErrorKind::Internal`] without further changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Denied,
    MalformedRequest,
    MismatchedIdentifier,
    NotWritable,
    Internal,
}

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No body or metadata exists for the ID.
    #[error("content not found: {0}")]
    NotFound(ContentId),

    /// Write into the manifest namespace through the data path.
    #[error("writes with prefix {0:?} are reserved for manifests")]
    Denied(ContentPrefix),

    /// Non-zero compression header with no registered algorithm.
    #[error("unknown compression header: {0}")]
    UnknownCompression(CompressionHeaderId),

    /// Payload addressed differently than the caller declared.
    #[error("mismatched content ID: declared {declared}, computed {actual}")]
    MismatchedIdentifier {
        declared: ContentId,
        actual: ContentId,
    },

    /// Write attempted through a read-only repository handle.
    #[error("repository is not writable")]
    NotWritable,

    /// Compressor or decompressor failure.
    #[error("compression error: {0}")]
    Compression(String),

    /// Stored body does not decode to what its metadata describes.
    #[error("corrupt content {id}: {reason}")]
    CorruptBlob { id: ContentId, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Denied(_) => ErrorKind::Denied,
            Self::UnknownCompression(_) => ErrorKind::MalformedRequest,
            Self::MismatchedIdentifier { .. } => ErrorKind::MismatchedIdentifier,
            Self::NotWritable => ErrorKind::NotWritable,
            Self::Compression(_) | Self::CorruptBlob { .. } | Self::Io(_) => ErrorKind::Internal,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
