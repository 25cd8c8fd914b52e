//! Content addressing for the Cairn content engine.
//!
//! Provides the addressing function that maps `(prefix, payload,
//! compression header)` to a [`cairn_types::ContentId`]. Digests are BLAKE3
//! over a domain-separated canonical encoding, optionally keyed with a
//! per-repository hashing secret.
//!
//! All crypto operations wrap established libraries -- no custom cryptography.

pub mod hasher;

pub use hasher::{AddressingPolicy, ContentHasher, HasherError, HASH_KEY_LEN};
