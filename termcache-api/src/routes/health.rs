//! Health Check Endpoints
//!
//! - /__ping - Liveness, always `pong`
//! - /__gtg - Good-to-go: 200 only when the snapshot is ready and non-empty
//! - /__health - JSON health report of the cache
//! - /__build-info - Package name and version
//!
//! `/ping` and `/build-info` are kept as aliases for older callers.
//!
//! No authentication required for health endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use termcache_core::TermSource;
use termcache_storage::CacheStore;

use crate::state::AppState;

/// GET /__ping - Simple pong response
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// Build information of the running binary.
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// GET /__build-info - Package name and version
pub async fn build_info() -> Json<BuildInfo> {
    Json(BuildInfo::current())
}

/// GET /__gtg - Ready to take traffic
pub async fn good_to_go<S: CacheStore, U: TermSource>(
    State(state): State<AppState<S, U>>,
) -> impl IntoResponse {
    if !state.cache.is_ready().await.is_serving() {
        return (StatusCode::SERVICE_UNAVAILABLE, "Cache is not ready");
    }

    match state.cache.query().count().await {
        Ok(count) if count > 0 => (StatusCode::OK, "OK"),
        Ok(_) => (StatusCode::SERVICE_UNAVAILABLE, "Cache is empty"),
        Err(e) => {
            tracing::warn!(error = %e, "Good-to-go count failed");
            (StatusCode::SERVICE_UNAVAILABLE, "Cache count failed")
        }
    }
}

/// GET /__health - Health report
pub async fn health<S: CacheStore, U: TermSource>(
    State(state): State<AppState<S, U>>,
) -> impl IntoResponse {
    let check = state.cache.health().await;
    let status_code = if check.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(check))
}
