use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use cairn_store::{RepositoryHandle, StoreError};
use cairn_types::{CompressionHeaderId, ContentId, ContentInfo, ContentPrefix, MANIFEST_PREFIX};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ApiError, ApiResult};

/// State shared by every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub repository: RepositoryHandle,
}

impl AppState {
    pub fn new(repository: RepositoryHandle) -> Self {
        Self { repository }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PutParams {
    /// Compression header as a base-16 string.
    pub compression: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PutResponse {
    pub content_id: ContentId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrefetchRequest {
    pub contents: Vec<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrefetchResponse {
    pub contents: Vec<ContentId>,
}

/// A read path whose ID does not parse names nothing that could exist.
fn read_id(raw: &str) -> ApiResult<ContentId> {
    raw.parse().map_err(|_| ApiError::UnknownId(raw.to_string()))
}

/// `GET /api/v1/contents/:id`
pub async fn content_get(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<Response> {
    let id = read_id(&raw)?;
    let payload = state.repository.get(&id).await?;
    tracing::debug!(id = %id, len = payload.len(), "served content");
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], payload).into_response())
}

/// `GET /api/v1/contents/:id/info`
pub async fn content_info(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<Json<ContentInfo>> {
    let id = read_id(&raw)?;
    Ok(Json(state.repository.info(&id).await?))
}

/// `PUT /api/v1/contents/:id?compression=<hex>`
///
/// The path ID is the address the client computed. Its prefix picks the
/// namespace; a different computed address fails the request. Anything
/// aimed at the manifest namespace is denied before the ID or the
/// compression value is looked at. An empty `compression` means none.
pub async fn content_put(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Query(params): Query<PutParams>,
    body: Bytes,
) -> ApiResult<Json<PutResponse>> {
    if !state.repository.supports_write() {
        return Err(StoreError::NotWritable.into());
    }
    if raw.starts_with(MANIFEST_PREFIX) {
        tracing::warn!(id = %raw, "refusing data write into manifest namespace");
        return Err(StoreError::Denied(ContentPrefix::Manifest).into());
    }
    let declared: ContentId = raw
        .parse()
        .map_err(|e| ApiError::Malformed(format!("content id {raw:?}: {e}")))?;
    let compression = match params.compression.as_deref().filter(|s| !s.is_empty()) {
        None => CompressionHeaderId::NONE,
        Some(s) => CompressionHeaderId::from_hex_str(s)
            .map_err(|e| ApiError::Malformed(format!("compression {s:?}: {e}")))?,
    };

    let content_id = state
        .repository
        .write_declared(&declared, &body, compression)
        .await?;
    Ok(Json(PutResponse { content_id }))
}

/// `POST /api/v1/prefetch`
///
/// Entries that do not parse are treated like unknown IDs and omitted.
pub async fn prefetch(
    State(state): State<AppState>,
    request: Result<Json<PrefetchRequest>, JsonRejection>,
) -> ApiResult<Json<PrefetchResponse>> {
    let Json(request) = request.map_err(|e| ApiError::Malformed(e.body_text()))?;
    let ids: Vec<ContentId> = request
        .contents
        .iter()
        .filter_map(|raw| raw.parse().ok())
        .collect();
    let contents = state
        .repository
        .prefetch(&ids, request.hint.as_deref())
        .await;
    Ok(Json(PrefetchResponse { contents }))
}

/// `GET /api/v1/health`
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "writable": state.repository.supports_write(),
    }))
}
