//! Content-addressed storage for Cairn backup repositories.
//!
//! Every body in a repository (file chunks, directory listings, manifests)
//! is stored once, under an ID derived from its bytes. Writing the same
//! payload twice yields the same ID and stores nothing new.
//!
//! # Layers
//!
//! - [`ContentBackend`] -- blob persistence with an atomic `put_if_absent`
//!   - [`InMemoryContentBackend`] -- `HashMap`-based, for tests and embedding
//!   - [`FsContentBackend`] -- one file per blob under a sharded directory
//! - [`ContentManager`] -- validate, address, dedup, compress, persist
//! - [`Prefetcher`] -- advisory batch residency checks
//! - [`RepositoryHandle`] -- direct (read/write) or remote (read-only) access
//!
//! # Design Rules
//!
//! 1. Bodies are immutable once written; a stored blob is never replaced.
//! 2. The manifest namespace (`m` prefix) is never writable through the data path.
//! 3. Compression changes how a body is stored, not how it reads back.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod blob;
pub mod compression;
pub mod error;
pub mod fs;
pub mod manager;
pub mod memory;
pub mod namespace;
pub mod prefetch;
pub mod repository;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use blob::StoredBlob;
pub use compression::{Algorithm, Compressor};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use fs::FsContentBackend;
pub use manager::{ContentManager, WriteOutcome, WrittenContent};
pub use memory::InMemoryContentBackend;
pub use prefetch::{Prefetcher, DEFAULT_MAX_BATCH};
pub use repository::{ContentReader, DirectRepository, RemoteRepository, RepositoryHandle};
pub use traits::{ContentBackend, PutOutcome};
