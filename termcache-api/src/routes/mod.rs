//! Route wiring.

pub mod health;
pub mod records;

use axum::{
    routing::{get, post},
    Router,
};
use termcache_core::TermSource;
use termcache_storage::CacheStore;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::state::AppState;

/// Build the full router: record routes under the configured prefix and the
/// health routes at the root.
pub fn create_router<S: CacheStore, U: TermSource>(
    state: AppState<S, U>,
    config: &ApiConfig,
) -> Router {
    let prefix = config.route_prefix.as_str();

    Router::new()
        .route(prefix, get(records::list_records::<S, U>))
        .route(&format!("{}/__ids", prefix), get(records::list_ids::<S, U>))
        .route(&format!("{}/__links", prefix), get(records::list_links::<S, U>))
        .route(&format!("{}/__count", prefix), get(records::count::<S, U>))
        .route(&format!("{}/__reload", prefix), post(records::reload::<S, U>))
        .route(&format!("{}/:id", prefix), get(records::get_record::<S, U>))
        .route("/__ping", get(health::ping))
        .route("/ping", get(health::ping))
        .route("/__build-info", get(health::build_info))
        .route("/build-info", get(health::build_info))
        .route("/__gtg", get(health::good_to_go::<S, U>))
        .route("/__health", get(health::health::<S, U>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
