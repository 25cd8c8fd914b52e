use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Numeric tag naming the compression applied to a stored body.
///
/// `0` means "uncompressed". Whether a non-zero value names a known
/// algorithm is decided by the compression registry in `cairn-store`; this
/// type only carries the number and its wire encoding.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CompressionHeaderId(u32);

impl CompressionHeaderId {
    /// No compression.
    pub const NONE: Self = Self(0);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// The raw numeric value.
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns `true` for the "uncompressed" header.
    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Big-endian encoding used in compressed-body framing and hashing.
    pub const fn to_be_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    pub const fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }

    /// Parse the wire form: a base-16 integer, optionally prefixed by `0x`.
    ///
    /// An empty string is not accepted here; callers treat an absent
    /// parameter as [`CompressionHeaderId::NONE`] before calling this.
    pub fn from_hex_str(s: &str) -> Result<Self, TypeError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidCompressionHeader(s.to_string()));
        }
        u32::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| TypeError::InvalidCompressionHeader(s.to_string()))
    }

    /// Wire form: lowercase base-16 without a `0x` prefix.
    pub fn to_hex_string(&self) -> String {
        format!("{:x}", self.0)
    }
}

impl From<u32> for CompressionHeaderId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Debug for CompressionHeaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompressionHeaderId({:#x})", self.0)
    }
}

impl fmt::Display for CompressionHeaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
