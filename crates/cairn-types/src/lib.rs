//! Foundation types for the Cairn content engine.
//!
//! This crate provides the identifier and metadata types shared by every
//! other Cairn crate. It performs no I/O and no hashing; digests are produced
//! by `cairn-crypto` and handed to [`ContentId::new`].
//!
//! # Key Types
//!
//! - [`ContentId`] -- Content-derived identifier: optional class prefix plus a 32-byte digest
//! - [`ContentPrefix`] -- Enumerated content class (data, manifest, or another tagged class)
//! - [`CompressionHeaderId`] -- 32-bit tag naming the compression applied to a stored body
//! - [`ContentInfo`] -- Metadata record for a stored body

pub mod compression;
pub mod content_id;
pub mod error;
pub mod info;

pub use compression::CompressionHeaderId;
pub use content_id::{ContentId, ContentPrefix, PrefixTag, DIGEST_LEN, MANIFEST_PREFIX};
pub use error::TypeError;
pub use info::ContentInfo;
