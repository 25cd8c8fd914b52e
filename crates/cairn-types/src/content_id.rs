use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Length of a content digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// The prefix character reserved for manifest-class content.
pub const MANIFEST_PREFIX: char = 'm';

const HEX_LEN: usize = DIGEST_LEN * 2;

/// A validated prefix character for a tagged (non-data, non-manifest) class.
///
/// Tags are lowercase ASCII letters in `g..=z`, excluding the manifest
/// character. The alphabet is disjoint from hex digits, which keeps the wire
/// format unambiguous: a rendered ID either starts with a hex digit (data)
/// or with a tag letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PrefixTag(u8);

impl PrefixTag {
    /// The tag character.
    pub fn as_char(&self) -> char {
        self.0 as char
    }
}

/// Content class of a [`ContentId`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentPrefix {
    /// Ordinary data: no prefix character.
    Data,
    /// Structured records owned by the manifest subsystem.
    Manifest,
    /// Any other writer-chosen class.
    Tagged(PrefixTag),
}

impl ContentPrefix {
    /// Classify a single prefix character.
    pub fn from_char(c: char) -> Result<Self, TypeError> {
        match c {
            MANIFEST_PREFIX => Ok(Self::Manifest),
            'g'..='z' => Ok(Self::Tagged(PrefixTag(c as u8))),
            _ => Err(TypeError::InvalidPrefix(c.to_string())),
        }
    }

    /// Parse a prefix string: empty for data, otherwise exactly one character.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Ok(Self::Data),
            (Some(c), None) => Self::from_char(c),
            _ => Err(TypeError::InvalidPrefix(s.to_string())),
        }
    }

    /// The prefix character, if any.
    pub fn as_char(&self) -> Option<char> {
        match self {
            Self::Data => None,
            Self::Manifest => Some(MANIFEST_PREFIX),
            Self::Tagged(tag) => Some(tag.as_char()),
        }
    }

    /// Single byte identifying the class inside hashed encodings.
    ///
    /// Data uses `0`, which no printable prefix can collide with.
    pub fn tag_byte(&self) -> u8 {
        self.as_char().map_or(0, |c| c as u8)
    }

    /// Returns `true` for the manifest class.
    pub fn is_manifest(&self) -> bool {
        matches!(self, Self::Manifest)
    }
}

impl Default for ContentPrefix {
    fn default() -> Self {
        Self::Data
    }
}

impl fmt::Display for ContentPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_char() {
            Some(c) => write!(f, "{c}"),
            None => Ok(()),
        }
    }
}

impl FromStr for ContentPrefix {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Content-derived identifier for a stored payload.
///
/// A `ContentId` pairs a [`ContentPrefix`] with a 32-byte digest. Its wire
/// form is the prefix character (if any) followed by 64 lowercase hex
/// characters. Parsing accepts exactly the strings that rendering produces,
/// so the mapping between IDs and their wire strings is one-to-one.
///
/// Ordering follows the wire string, which gives deterministic enumeration
/// regardless of how IDs were produced.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentId {
    prefix: ContentPrefix,
    digest: [u8; DIGEST_LEN],
}

impl ContentId {
    /// Create an ID from a prefix and a pre-computed digest.
    pub const fn new(prefix: ContentPrefix, digest: [u8; DIGEST_LEN]) -> Self {
        Self { prefix, digest }
    }

    /// The content class.
    pub fn prefix(&self) -> ContentPrefix {
        self.prefix
    }

    /// The raw digest bytes.
    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Returns `true` if this ID lives in the manifest namespace.
    pub fn is_manifest(&self) -> bool {
        self.prefix.is_manifest()
    }

    /// Hex-encoded digest without the prefix.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Short representation for logs: prefix plus the first 8 hex characters.
    pub fn short_hex(&self) -> String {
        format!("{}{}", self.prefix, hex::encode(&self.digest[..4]))
    }

    /// Parse from the wire form.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let (prefix, hex_part) = match s.len() {
            HEX_LEN => (ContentPrefix::Data, s),
            n if n == HEX_LEN + 1 => {
                let first = s.chars().next().unwrap_or_default();
                if !first.is_ascii() {
                    return Err(TypeError::InvalidPrefix(first.to_string()));
                }
                (ContentPrefix::from_char(first)?, &s[1..])
            }
            actual => {
                return Err(TypeError::InvalidLength {
                    expected: HEX_LEN,
                    actual,
                })
            }
        };

        // hex::decode accepts uppercase; the wire form does not.
        if let Some(bad) = hex_part
            .chars()
            .find(|c| !matches!(c, '0'..='9' | 'a'..='f'))
        {
            return Err(TypeError::InvalidHex(format!(
                "unexpected character {bad:?} in {s:?}"
            )));
        }

        let mut digest = [0u8; DIGEST_LEN];
        hex::decode_to_slice(hex_part, &mut digest)
            .map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Ok(Self { prefix, digest })
    }
}

impl PartialOrd for ContentId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ContentId {
    /// Agrees with the order of the rendered strings: unprefixed IDs start
    /// with a hex digit, which sorts below every prefix letter, and lowercase
    /// hex preserves byte order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.prefix
            .as_char()
            .cmp(&other.prefix.as_char())
            .then_with(|| self.digest.cmp(&other.digest))
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.short_hex())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.digest_hex())
    }
}

impl FromStr for ContentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
