use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// Cairn content server.
pub struct CairnServer {
    config: ServerConfig,
    state: AppState,
}

impl CairnServer {
    /// Open the configured repository.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let repository = config.open_repository()?;
        Ok(Self {
            config,
            state: AppState::new(repository),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), self.config.max_body_size)
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            writable = self.state.repository.supports_write(),
            "cairn server listening"
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
