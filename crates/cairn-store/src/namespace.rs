//! Namespace guard for the data-write path.
//!
//! Manifests are written through their own privileged path. Anything that
//! arrives through the content write path with the manifest prefix is a
//! client error and is refused outright. Reads are never checked.

use cairn_types::ContentPrefix;

use crate::error::{StoreError, StoreResult};

/// Validate a writer-supplied prefix.
pub fn validate_write_prefix(prefix: ContentPrefix) -> StoreResult<()> {
    if prefix.is_manifest() {
        tracing::warn!(%prefix, "refusing data write into manifest namespace");
        return Err(StoreError::Denied(prefix));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_and_tagged_are_allowed() {
        assert!(validate_write_prefix(ContentPrefix::Data).is_ok());
        for c in ('g'..='z').filter(|c| *c != 'm') {
            let prefix = ContentPrefix::from_char(c).unwrap();
            assert!(validate_write_prefix(prefix).is_ok(), "{c} should be allowed");
        }
    }

    #[test]
    fn manifest_is_denied() {
        let err = validate_write_prefix(ContentPrefix::Manifest).unwrap_err();
        assert!(matches!(err, StoreError::Denied(ContentPrefix::Manifest)));
    }
}
