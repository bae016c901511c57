//! termcache Server Entry Point
//!
//! Bootstraps configuration, starts the initial load pass in the background
//! and serves the snapshot over HTTP until Ctrl-C.

use std::sync::Arc;

use termcache_api::telemetry::init_tracing;
use termcache_api::{create_router, ApiConfig, ApiError, ApiResult, AppState, HttpTermSource};
use termcache_core::CacheConfig;
use termcache_storage::{LmdbCacheStore, TermCache};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing()?;

    let cache_config = CacheConfig::from_env();
    cache_config.validate()?;
    let api_config = ApiConfig::from_env();
    api_config.validate()?;

    let store = Arc::new(LmdbCacheStore::from_config(&cache_config));
    let source = Arc::new(HttpTermSource::new(&api_config, cache_config.page_size)?);
    let cache = Arc::new(TermCache::new(store, source, &cache_config));

    // Requests get 503 until this pass completes.
    let _initial_pass = cache.start()?;

    let app = create_router(AppState::new(Arc::clone(&cache)), &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(
        %addr,
        prefix = %api_config.route_prefix,
        cache_path = %cache_config.cache_path.display(),
        "Starting termcache server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    // Waits for an in-flight pass, then for open streams, then closes the store.
    let grace = cache_config.close_timeout * 2;
    match tokio::time::timeout(grace, cache.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Cache shutdown failed"),
        Err(_) => tracing::warn!(timeout_secs = grace.as_secs(), "Cache shutdown timed out"),
    }

    Ok(())
}
