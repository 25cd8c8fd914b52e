//! HTTP server for the Cairn content engine.
//!
//! Serves one repository's content store over a small JSON/octet-stream
//! API under `/api/v1`: read, write and inspect content by ID, and ask
//! which of a batch of IDs are resident.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::{PrefetchConfig, RepositoryConfig, ServerConfig, StorageConfig, StorageKind};
pub use error::{ApiError, ApiResult, ErrorResponse, ServerError, ServerResult};
pub use handler::AppState;
pub use server::CairnServer;
