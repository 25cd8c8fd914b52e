//! Compression header registry.
//!
//! A fixed table compiled into the binary. There is no runtime registration,
//! so lookups need no synchronization.

use std::io::{Read, Write};

use cairn_types::CompressionHeaderId;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::error::{StoreError, StoreResult};

/// A compression algorithm and its tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Gzip { level: u32 },
    Zstd { level: i32 },
}

/// A registered compressor.
#[derive(Debug, PartialEq, Eq)]
pub struct Compressor {
    pub header_id: CompressionHeaderId,
    pub name: &'static str,
    pub algorithm: Algorithm,
}

static REGISTRY: [Compressor; 7] = [
    Compressor {
        header_id: CompressionHeaderId::new(0x1000),
        name: "gzip",
        algorithm: Algorithm::Gzip { level: 6 },
    },
    Compressor {
        header_id: CompressionHeaderId::new(0x1001),
        name: "gzip-best-speed",
        algorithm: Algorithm::Gzip { level: 1 },
    },
    Compressor {
        header_id: CompressionHeaderId::new(0x1002),
        name: "gzip-best-compression",
        algorithm: Algorithm::Gzip { level: 9 },
    },
    Compressor {
        header_id: CompressionHeaderId::new(0x1100),
        name: "zstd",
        algorithm: Algorithm::Zstd { level: 3 },
    },
    Compressor {
        header_id: CompressionHeaderId::new(0x1101),
        name: "zstd-fastest",
        algorithm: Algorithm::Zstd { level: 1 },
    },
    Compressor {
        header_id: CompressionHeaderId::new(0x1102),
        name: "zstd-better-compression",
        algorithm: Algorithm::Zstd { level: 9 },
    },
    Compressor {
        header_id: CompressionHeaderId::new(0x1103),
        name: "zstd-best-compression",
        algorithm: Algorithm::Zstd { level: 19 },
    },
];

/// All registered compressors, ordered by header ID.
pub fn algorithms() -> &'static [Compressor] {
    &REGISTRY
}

/// Look up a compressor by header ID. `NONE` is never in the table.
pub fn by_header_id(id: CompressionHeaderId) -> Option<&'static Compressor> {
    REGISTRY.iter().find(|c| c.header_id == id)
}

/// Look up a compressor by name (`"none"` is not a compressor).
pub fn by_name(name: &str) -> Option<&'static Compressor> {
    REGISTRY.iter().find(|c| c.name == name)
}

/// Resolve a header for a write.
///
/// `Ok(None)` means "no compression"; unknown non-zero headers are rejected.
pub fn resolve(id: CompressionHeaderId) -> StoreResult<Option<&'static Compressor>> {
    if id.is_none() {
        return Ok(None);
    }
    by_header_id(id)
        .map(Some)
        .ok_or(StoreError::UnknownCompression(id))
}

impl Compressor {
    /// Compress into a raw stream (no framing).
    pub fn compress(&self, input: &[u8]) -> StoreResult<Vec<u8>> {
        match self.algorithm {
            Algorithm::Gzip { level } => {
                let mut encoder = GzEncoder::new(
                    Vec::with_capacity(input.len() / 2),
                    flate2::Compression::new(level),
                );
                encoder
                    .write_all(input)
                    .map_err(|e| StoreError::Compression(format!("{}: {e}", self.name)))?;
                encoder
                    .finish()
                    .map_err(|e| StoreError::Compression(format!("{}: {e}", self.name)))
            }
            Algorithm::Zstd { level } => zstd::encode_all(input, level)
                .map_err(|e| StoreError::Compression(format!("{}: {e}", self.name))),
        }
    }

    /// Decompress a raw stream produced by [`Compressor::compress`].
    ///
    /// Output is capped at `limit` bytes; a stream that decodes to more is
    /// rejected without buffering the excess.
    pub fn decompress(&self, input: &[u8], limit: u64) -> StoreResult<Vec<u8>> {
        let err = |e: std::io::Error| StoreError::Compression(format!("{}: {e}", self.name));
        let mut out = Vec::new();
        let read = match self.algorithm {
            Algorithm::Gzip { .. } => GzDecoder::new(input)
                .take(limit.saturating_add(1))
                .read_to_end(&mut out),
            Algorithm::Zstd { .. } => zstd::stream::read::Decoder::new(input)
                .map_err(err)?
                .take(limit.saturating_add(1))
                .read_to_end(&mut out),
        };
        read.map_err(err)?;
        if out.len() as u64 > limit {
            return Err(StoreError::Compression(format!(
                "{}: stream decodes to more than {limit} bytes",
                self.name
            )));
        }
        Ok(out)
    }
}
