use serde::{Deserialize, Serialize};

use crate::compression::CompressionHeaderId;
use crate::content_id::ContentId;

/// Metadata for a stored body.
///
/// `location` is bookkeeping owned by the storage backend (a file path, a
/// pack reference). The engine passes it through without interpreting it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentInfo {
    pub content_id: ContentId,
    /// Length of the payload as originally written.
    pub original_length: u64,
    /// Length of the body as persisted (after compression framing).
    pub stored_length: u64,
    /// Compression actually applied to the stored body.
    pub compression_header: CompressionHeaderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ContentInfo {
    /// Returns `true` if the stored body is compressed.
    pub fn is_compressed(&self) -> bool {
        !self.compression_header.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_id::ContentPrefix;

    #[test]
    fn serde_omits_missing_location() {
        let info = ContentInfo {
            content_id: ContentId::new(ContentPrefix::Data, [1; 32]),
            original_length: 10,
            stored_length: 10,
            compression_header: CompressionHeaderId::NONE,
            location: None,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("location").is_none());
        assert_eq!(json["compression_header"], 0);
        assert!(!info.is_compressed());

        let back: ContentInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, info);
    }
}
