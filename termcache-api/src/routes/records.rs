//! Record Endpoints
//!
//! Listing endpoints stream newline-delimited JSON straight from a cursor
//! scan, so a slow client slows the scan down instead of growing a buffer.
//! An error mid-stream aborts the response body.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use termcache_core::{Record, StorageError, TermSource, TermcacheResult};
use termcache_storage::{CacheStore, QueryEngine, RecordStream};
use tokio_stream::StreamExt;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Content type of streamed listings.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

// ============================================================================
// HANDLERS
// ============================================================================

/// GET {prefix} - Stream every record
pub async fn list_records<S: CacheStore, U: TermSource>(
    State(state): State<AppState<S, U>>,
) -> ApiResult<Response> {
    let query = state.cache.query();
    ensure_records(query).await?;
    Ok(ndjson(query.stream_all().await?))
}

/// GET {prefix}/__ids - Stream every record id
pub async fn list_ids<S: CacheStore, U: TermSource>(
    State(state): State<AppState<S, U>>,
) -> ApiResult<Response> {
    let query = state.cache.query();
    ensure_records(query).await?;
    Ok(ndjson(query.stream_ids().await?))
}

/// GET {prefix}/__links - Stream every record as `{id, url}`
pub async fn list_links<S: CacheStore, U: TermSource>(
    State(state): State<AppState<S, U>>,
) -> ApiResult<Response> {
    let query = state.cache.query();
    ensure_records(query).await?;
    Ok(ndjson(query.stream_links().await?))
}

/// GET {prefix}/__count - Number of cached records as plain text
pub async fn count<S: CacheStore, U: TermSource>(
    State(state): State<AppState<S, U>>,
) -> ApiResult<String> {
    let query = state.cache.query();
    let count = query.count().await?;

    if count == 0 && !query.is_ready().await.is_serving() {
        return Err(ApiError::service_unavailable("Cache is not ready"));
    }

    Ok(count.to_string())
}

/// GET {prefix}/:id - Single record
pub async fn get_record<S: CacheStore, U: TermSource>(
    State(state): State<AppState<S, U>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Record>> {
    state
        .cache
        .query()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::record_not_found(&id))
}

/// POST {prefix}/__reload - Start a reload in the background
pub async fn reload<S: CacheStore, U: TermSource>(
    State(state): State<AppState<S, U>>,
) -> ApiResult<impl IntoResponse> {
    // The pass logs its own outcome; the handle is not awaited.
    let _pass = state.cache.request_reload().await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "message": "Reloading" })),
    ))
}

// ============================================================================
// STREAMING
// ============================================================================

/// Listings of an empty snapshot are 404, of an unready cache 503.
///
/// Counts before any stream is opened, so no serving guard is held twice.
async fn ensure_records<S: CacheStore>(query: &QueryEngine<S>) -> ApiResult<()> {
    if query.count().await? > 0 {
        return Ok(());
    }

    Err(if query.is_ready().await.is_serving() {
        ApiError::no_records()
    } else {
        ApiError::service_unavailable("Cache is not ready")
    })
}

fn ndjson<T>(stream: RecordStream<T>) -> Response
where
    T: Serialize + Send + 'static,
{
    let lines = stream.map(|item| {
        let line = item.and_then(|value| encode_line(&value));
        if let Err(e) = &line {
            tracing::warn!(error = %e, "Aborting streamed response");
        }
        line
    });

    (
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from_stream(lines),
    )
        .into_response()
}

fn encode_line<T: Serialize>(value: &T) -> TermcacheResult<Vec<u8>> {
    let mut line = serde_json::to_vec(value).map_err(|e| StorageError::Serialization {
        id: "stream item".to_string(),
        reason: e.to_string(),
    })?;
    line.push(b'\n');
    Ok(line)
}
