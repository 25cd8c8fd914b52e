use std::fmt;

use cairn_types::{CompressionHeaderId, ContentId, ContentPrefix};
use serde::{Deserialize, Serialize};

/// Length of a repository hashing key in bytes.
pub const HASH_KEY_LEN: usize = 32;

const DOMAIN: &str = "cairn-content-v1";

/// Whether the compression header participates in a content digest.
///
/// The policy is a repository-format property: it is chosen when a
/// repository is created and must never change afterwards, since flipping it
/// gives existing content new addresses and breaks dedup continuity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressingPolicy {
    /// Digest covers the uncompressed payload only. The same payload written
    /// with different compression settings dedups to one address.
    #[default]
    ContentOnly,
    /// Digest also covers the compression header, so each compression
    /// setting yields its own address.
    CompressionSensitive,
}

impl fmt::Display for AddressingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentOnly => write!(f, "content-only"),
            Self::CompressionSensitive => write!(f, "compression-sensitive"),
        }
    }
}

/// The content addressing function.
///
/// Computes BLAKE3 over a canonical encoding:
///
/// ```text
/// "cairn-content-v1" ":" prefix-tag-byte [header-be-u32] payload
/// ```
///
/// The header field is present only under
/// [`AddressingPolicy::CompressionSensitive`]. Every field before the payload
/// has a fixed width, so no two inputs share an encoding. When a repository
/// key is configured the hash is keyed, which keeps addresses from leaking
/// across repositories.
#[derive(Clone)]
pub struct ContentHasher {
    policy: AddressingPolicy,
    key: Option<[u8; HASH_KEY_LEN]>,
}

impl ContentHasher {
    /// Unkeyed hasher with the given policy.
    pub const fn new(policy: AddressingPolicy) -> Self {
        Self { policy, key: None }
    }

    /// Keyed hasher with the given policy.
    pub const fn keyed(policy: AddressingPolicy, key: [u8; HASH_KEY_LEN]) -> Self {
        Self {
            policy,
            key: Some(key),
        }
    }

    /// Keyed hasher from a 64-character hex key.
    pub fn from_hex_key(policy: AddressingPolicy, key_hex: &str) -> Result<Self, HasherError> {
        let mut key = [0u8; HASH_KEY_LEN];
        hex::decode_to_slice(key_hex, &mut key)
            .map_err(|e| HasherError::InvalidKey(e.to_string()))?;
        Ok(Self::keyed(policy, key))
    }

    pub fn policy(&self) -> AddressingPolicy {
        self.policy
    }

    /// Returns `true` if a repository key is configured.
    pub fn is_keyed(&self) -> bool {
        self.key.is_some()
    }

    /// Derive the content ID for a payload.
    pub fn address(
        &self,
        prefix: ContentPrefix,
        payload: &[u8],
        compression: CompressionHeaderId,
    ) -> ContentId {
        let mut hasher = match &self.key {
            Some(key) => blake3::Hasher::new_keyed(key),
            None => blake3::Hasher::new(),
        };
        hasher.update(DOMAIN.as_bytes());
        hasher.update(b":");
        hasher.update(&[prefix.tag_byte()]);
        if self.policy == AddressingPolicy::CompressionSensitive {
            hasher.update(&compression.to_be_bytes());
        }
        hasher.update(payload);
        ContentId::new(prefix, *hasher.finalize().as_bytes())
    }

    /// Check that a payload addresses to `expected`.
    pub fn verify(
        &self,
        payload: &[u8],
        compression: CompressionHeaderId,
        expected: &ContentId,
    ) -> bool {
        self.address(expected.prefix(), payload, compression) == *expected
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(AddressingPolicy::default())
    }
}

impl fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentHasher")
            .field("policy", &self.policy)
            .field("keyed", &self.is_keyed())
            .finish()
    }
}

/// Errors from hasher construction.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("invalid repository hash key: {0}")]
    InvalidKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ZSTD: CompressionHeaderId = CompressionHeaderId::new(0x1100);
    const GZIP: CompressionHeaderId = CompressionHeaderId::new(0x1000);

    fn tagged(c: char) -> ContentPrefix {
        ContentPrefix::from_char(c).unwrap()
    }

    #[test]
    fn address_is_deterministic() {
        let hasher = ContentHasher::default();
        let a = hasher.address(ContentPrefix::Data, b"hello", CompressionHeaderId::NONE);
        let b = hasher.address(ContentPrefix::Data, b"hello", CompressionHeaderId::NONE);
        assert_eq!(a, b);
        assert_eq!(a.prefix(), ContentPrefix::Data);
    }

    #[test]
    fn known_vector_is_stable() {
        // Pins the canonical encoding; a change here breaks every existing repository.
        let mut expected = blake3::Hasher::new();
        expected.update(b"cairn-content-v1:");
        expected.update(&[0]);
        expected.update(b"hello");
        let id = ContentHasher::default().address(
            ContentPrefix::Data,
            b"hello",
            CompressionHeaderId::NONE,
        );
        assert_eq!(id.digest(), expected.finalize().as_bytes());
    }

    #[test]
    fn empty_payload_has_an_address() {
        let id = ContentHasher::default().address(
            ContentPrefix::Data,
            b"",
            CompressionHeaderId::NONE,
        );
        assert_ne!(id.digest(), &[0u8; 32]);
    }

    #[test]
    fn prefix_changes_digest() {
        let hasher = ContentHasher::default();
        let data = hasher.address(ContentPrefix::Data, b"x", CompressionHeaderId::NONE);
        let k = hasher.address(tagged('k'), b"x", CompressionHeaderId::NONE);
        assert_ne!(data.digest(), k.digest());
    }

    #[test]
    fn content_only_ignores_compression() {
        let hasher = ContentHasher::new(AddressingPolicy::ContentOnly);
        let plain = hasher.address(ContentPrefix::Data, b"payload", CompressionHeaderId::NONE);
        let zstd = hasher.address(ContentPrefix::Data, b"payload", ZSTD);
        let gzip = hasher.address(ContentPrefix::Data, b"payload", GZIP);
        assert_eq!(plain, zstd);
        assert_eq!(zstd, gzip);
    }

    #[test]
    fn compression_sensitive_separates_headers() {
        let hasher = ContentHasher::new(AddressingPolicy::CompressionSensitive);
        let plain = hasher.address(ContentPrefix::Data, b"payload", CompressionHeaderId::NONE);
        let zstd = hasher.address(ContentPrefix::Data, b"payload", ZSTD);
        let gzip = hasher.address(ContentPrefix::Data, b"payload", GZIP);
        assert_ne!(plain, zstd);
        assert_ne!(zstd, gzip);
    }

    #[test]
    fn keyed_differs_from_unkeyed() {
        let unkeyed = ContentHasher::default();
        let keyed = ContentHasher::keyed(AddressingPolicy::ContentOnly, [9; 32]);
        let other = ContentHasher::keyed(AddressingPolicy::ContentOnly, [10; 32]);
        let p = ContentPrefix::Data;
        let h = CompressionHeaderId::NONE;
        assert_ne!(unkeyed.address(p, b"d", h), keyed.address(p, b"d", h));
        assert_ne!(keyed.address(p, b"d", h), other.address(p, b"d", h));
    }

    #[test]
    fn from_hex_key() {
        let hasher =
            ContentHasher::from_hex_key(AddressingPolicy::ContentOnly, &"ab".repeat(32)).unwrap();
        assert!(hasher.is_keyed());
        assert_eq!(
            hasher.address(ContentPrefix::Data, b"d", CompressionHeaderId::NONE),
            ContentHasher::keyed(AddressingPolicy::ContentOnly, [0xab; 32]).address(
                ContentPrefix::Data,
                b"d",
                CompressionHeaderId::NONE
            )
        );
        assert!(matches!(
            ContentHasher::from_hex_key(AddressingPolicy::ContentOnly, "abcd"),
            Err(HasherError::InvalidKey(_))
        ));
    }

    #[test]
    fn debug_hides_key() {
        let hasher = ContentHasher::keyed(AddressingPolicy::ContentOnly, [0xee; 32]);
        let debug = format!("{hasher:?}");
        assert!(debug.contains("keyed: true"));
        assert!(!debug.contains("238"));
    }

    #[test]
    fn verify_detects_tampering() {
        let hasher = ContentHasher::default();
        let id = hasher.address(ContentPrefix::Data, b"original", CompressionHeaderId::NONE);
        assert!(hasher.verify(b"original", CompressionHeaderId::NONE, &id));
        assert!(!hasher.verify(b"tampered", CompressionHeaderId::NONE, &id));
    }

    #[test]
    fn policy_serde_names() {
        assert_eq!(
            serde_json::to_string(&AddressingPolicy::CompressionSensitive).unwrap(),
            "\"compression-sensitive\""
        );
        assert_eq!(AddressingPolicy::ContentOnly.to_string(), "content-only");
    }

    proptest! {
        #[test]
        fn repeated_addressing_agrees(payload in proptest::collection::vec(any::<u8>(), 0..2048), header in any::<u32>()) {
            for policy in [AddressingPolicy::ContentOnly, AddressingPolicy::CompressionSensitive] {
                let first = ContentHasher::new(policy)
                    .address(ContentPrefix::Data, &payload, CompressionHeaderId::new(header));
                let second = ContentHasher::new(policy)
                    .address(ContentPrefix::Data, &payload, CompressionHeaderId::new(header));
                prop_assert_eq!(first, second);
            }
        }
    }
}
