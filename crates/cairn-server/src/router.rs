use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all content endpoints.
pub fn build_router(state: AppState, max_body_size: usize) -> Router {
    Router::new()
        .route("/api/v1/health", get(handler::health))
        .route(
            "/api/v1/contents/:id",
            get(handler::content_get).put(handler::content_put),
        )
        .route("/api/v1/contents/:id/info", get(handler::content_info))
        .route("/api/v1/prefetch", post(handler::prefetch))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
