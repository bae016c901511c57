//! HttpTermSource against a local axum server standing in for the upstream.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use termcache_api::{ApiConfig, HttpTermSource};
use termcache_core::{RawTerm, TermSource, UpstreamError};
use termcache_storage::{LmdbCacheStore, TermCache};
use termcache_test_utils::fixtures::*;

// ============================================================================
// FAKE UPSTREAM
// ============================================================================

#[derive(Clone)]
struct Upstream {
    terms: Arc<Vec<RawTerm>>,
    fail_from: Option<usize>,
}

async fn serve_terms(
    State(upstream): State<Upstream>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> axum::response::Response {
    if let Some(auth) = headers.get("authorization") {
        if auth.to_str().ok() != Some("Bearer secret") {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let parse = |name: &str| params.get(name).and_then(|value| value.parse::<usize>().ok());
    let (Some(limit), Some(start)) = (parse("maximumRecords"), parse("startRecord")) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    if upstream.fail_from.is_some_and(|from| start >= from) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let page: Vec<RawTerm> = upstream.terms.iter().skip(start).take(limit).cloned().collect();
    Json(page).into_response()
}

/// Spawn the fake upstream and return its URL.
async fn spawn_upstream(terms: Vec<RawTerm>, fail_from: Option<usize>) -> String {
    let app = Router::new()
        .route("/terms", get(serve_terms))
        .with_state(Upstream {
            terms: Arc::new(terms),
            fail_from,
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{}/terms", addr)
}

fn client_config(url: String) -> ApiConfig {
    ApiConfig {
        upstream_url: url,
        ..ApiConfig::default()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_fetch_pages_by_offset() {
    let url = spawn_upstream(numbered_terms(5), None).await;
    let source = HttpTermSource::new(&client_config(url), 2).expect("client should build");

    let first = source.fetch_page(0).await.expect("first page");
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].raw_id, "term-0");

    let last = source.fetch_page(4).await.expect("last page");
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].raw_id, "term-4");

    assert!(source.fetch_page(6).await.expect("past the end").is_empty());
}

#[tokio::test]
async fn test_http_error_is_fetch_failed() {
    let url = spawn_upstream(numbered_terms(5), Some(2)).await;
    let source = HttpTermSource::new(&client_config(url), 2).expect("client should build");

    assert!(source.fetch_page(0).await.is_ok());
    match source.fetch_page(2).await {
        Err(UpstreamError::FetchFailed { offset, reason }) => {
            assert_eq!(offset, 2);
            assert!(reason.contains("500"));
        }
        other => panic!("expected FetchFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let url = spawn_upstream(bob_and_fred(), None).await;

    let mut config = client_config(url);
    config.upstream_token = Some("wrong".to_string());
    let rejected = HttpTermSource::new(&config, 10).expect("client should build");
    assert!(rejected.fetch_page(0).await.is_err());

    config.upstream_token = Some("secret".to_string());
    let accepted = HttpTermSource::new(&config, 10).expect("client should build");
    assert_eq!(accepted.fetch_page(0).await.expect("page"), bob_and_fred());
}

#[tokio::test]
async fn test_unreachable_upstream_is_fetch_failed() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener address");
    drop(listener);

    let source = HttpTermSource::new(&client_config(format!("http://{}/terms", addr)), 10)
        .expect("client should build");
    assert!(matches!(
        source.fetch_page(0).await,
        Err(UpstreamError::FetchFailed { offset: 0, .. })
    ));
}

#[tokio::test]
async fn test_full_pass_over_http() {
    let url = spawn_upstream(numbered_terms(7), None).await;
    let (config, _dir) = temp_cache_config(3);
    let store = Arc::new(LmdbCacheStore::from_config(&config));
    let source = Arc::new(HttpTermSource::new(&client_config(url), config.page_size).expect("client"));
    let cache = TermCache::new(store, source, &config);

    let report = cache.load().await.expect("load should succeed");
    assert_eq!(report.pages, 3);
    assert_eq!(report.records, 7);
    assert_eq!(cache.query().count().await.expect("count"), 7);
}
