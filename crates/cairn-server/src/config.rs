use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cairn_crypto::{AddressingPolicy, ContentHasher};
use cairn_store::{
    ContentBackend, ContentManager, FsContentBackend, InMemoryContentBackend, RepositoryHandle,
    DEFAULT_MAX_BATCH,
};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Largest accepted request body, in bytes.
    pub max_body_size: usize,
    pub storage: StorageConfig,
    pub repository: RepositoryConfig,
    pub prefetch: PrefetchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8420)),
            max_body_size: 64 * 1024 * 1024,
            storage: StorageConfig::default(),
            repository: RepositoryConfig::default(),
            prefetch: PrefetchConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    Filesystem,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Root directory; required for `filesystem`.
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub addressing_policy: AddressingPolicy,
    /// 32-byte repository hashing key, hex encoded.
    pub hash_key: Option<String>,
    /// Serve through a read-only handle; every write returns `NOT_WRITABLE`.
    pub read_only: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    pub max_batch: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            max_batch: DEFAULT_MAX_BATCH,
        }
    }
}

impl ServerConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.storage.kind == StorageKind::Filesystem && self.storage.path.is_none() {
            return Err(ServerError::Config(
                "storage.path is required for filesystem storage".into(),
            ));
        }
        if self.prefetch.max_batch == 0 {
            return Err(ServerError::Config("prefetch.max_batch must be positive".into()));
        }
        if self.max_body_size == 0 {
            return Err(ServerError::Config("max_body_size must be positive".into()));
        }
        self.hasher()?;
        Ok(())
    }

    /// The addressing function for this repository.
    pub fn hasher(&self) -> ServerResult<ContentHasher> {
        let policy = self.repository.addressing_policy;
        match &self.repository.hash_key {
            Some(key) => ContentHasher::from_hex_key(policy, key)
                .map_err(|e| ServerError::Config(format!("repository.hash_key: {e}"))),
            None => Ok(ContentHasher::new(policy)),
        }
    }

    /// Open the configured backend and wrap it in a repository handle.
    pub fn open_repository(&self) -> ServerResult<RepositoryHandle> {
        self.validate()?;
        let backend: Arc<dyn ContentBackend> = match self.storage.kind {
            StorageKind::Memory => Arc::new(InMemoryContentBackend::new()),
            StorageKind::Filesystem => {
                let root = self.storage.path.as_ref().ok_or_else(|| {
                    ServerError::Config("storage.path is required for filesystem storage".into())
                })?;
                Arc::new(FsContentBackend::open(root)?)
            }
        };
        let manager = Arc::new(
            ContentManager::new(backend, self.hasher()?)
                .with_prefetch_limit(self.prefetch.max_batch),
        );
        tracing::debug!(
            storage = ?self.storage.kind,
            policy = %self.repository.addressing_policy,
            read_only = self.repository.read_only,
            "opened repository"
        );
        Ok(if self.repository.read_only {
            RepositoryHandle::remote(manager)
        } else {
            RepositoryHandle::direct(manager)
        })
    }
}
