//! HTTP surface tests: routes driven with `oneshot` against a term cache
//! backed by LMDB in a temporary directory and an in-memory upstream.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use termcache_api::{create_router, ApiConfig, AppState};
use termcache_core::{RawTerm, Record};
use termcache_storage::{LmdbCacheStore, TermCache};
use termcache_test_utils::fixtures::*;
use termcache_test_utils::PagedTermSource;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

// ============================================================================
// HELPERS
// ============================================================================

type TestCache = TermCache<LmdbCacheStore, PagedTermSource>;

struct TestApp {
    cache: Arc<TestCache>,
    router: Router,
    _dir: TempDir,
}

fn test_app(terms: Vec<RawTerm>) -> TestApp {
    let (config, dir) = temp_cache_config(10);
    let store = Arc::new(LmdbCacheStore::from_config(&config));
    let source = Arc::new(PagedTermSource::from_terms(10, terms));
    let cache = Arc::new(TermCache::new(store, source, &config));
    let router = create_router(AppState::new(Arc::clone(&cache)), &ApiConfig::default());
    TestApp {
        cache,
        router,
        _dir: dir,
    }
}

async fn loaded_app(terms: Vec<RawTerm>) -> TestApp {
    let app = test_app(terms);
    app.cache.load().await.expect("load should succeed");
    app
}

async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, String, Option<String>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let body = String::from_utf8(bytes.to_vec()).expect("body should be UTF-8");
    (status, body, content_type)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    let (status, body, _) = send(router, "GET", uri).await;
    (status, body)
}

// ============================================================================
// RECORD ROUTES
// ============================================================================

#[tokio::test]
async fn test_list_records_streams_ndjson() {
    let app = loaded_app(bob_and_fred()).await;

    let (status, body, content_type) = send(&app.router, "GET", "/transformers/people").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/x-ndjson"));

    let records: Vec<Record> = body
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be a record"))
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, BOB_ID);
    assert_eq!(records[1].id, FRED_ID);
    assert!(body.contains("\"sourceRefs\""));
}

#[tokio::test]
async fn test_listings_of_empty_snapshot_are_not_found() {
    let app = loaded_app(Vec::new()).await;

    for uri in [
        "/transformers/people",
        "/transformers/people/__ids",
        "/transformers/people/__links",
    ] {
        let (status, body) = get(&app.router, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        let json: serde_json::Value =
            serde_json::from_str(&body).expect("error body should be JSON");
        assert_eq!(json["code"], "ENTITY_NOT_FOUND", "{}", uri);
    }

    let (status, body) = get(&app.router, "/transformers/people/__count").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "0");
}

#[tokio::test]
async fn test_routes_unavailable_before_load() {
    let app = test_app(bob_and_fred());

    for uri in [
        "/transformers/people",
        "/transformers/people/__ids",
        "/transformers/people/__links",
        "/transformers/people/__count",
        "/__gtg",
        "/__health",
    ] {
        let (status, _) = get(&app.router, uri).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
    }

    let (status, _) = get(&app.router, &format!("/transformers/people/{}", BOB_ID)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = get(&app.router, "/__ping").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app.router, "POST", "/transformers/people/__reload").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_ids_and_links() {
    let app = loaded_app(bob_and_fred()).await;

    let (status, body) = get(&app.router, "/transformers/people/__ids").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        format!("{{\"id\":\"{}\"}}\n{{\"id\":\"{}\"}}\n", BOB_ID, FRED_ID)
    );

    let (status, body) = get(&app.router, "/transformers/people/__links").await;
    assert_eq!(status, StatusCode::OK);
    let first: serde_json::Value =
        serde_json::from_str(body.lines().next().expect("at least one link"))
            .expect("link should be JSON");
    assert_eq!(first["id"], BOB_ID);
    assert_eq!(
        first["url"],
        format!("http://localhost:8080/transformers/people/{}", BOB_ID)
    );
}

#[tokio::test]
async fn test_count_is_plain_text() {
    let app = loaded_app(numbered_terms(13)).await;

    let (status, body) = get(&app.router, "/transformers/people/__count").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "13");
}

#[tokio::test]
async fn test_get_record_hit_and_miss() {
    let app = loaded_app(bob_and_fred()).await;

    let (status, body) = get(&app.router, &format!("/transformers/people/{}", BOB_ID)).await;
    assert_eq!(status, StatusCode::OK);
    let record: Record = serde_json::from_str(&body).expect("record body");
    assert_eq!(record.label, "Bob");
    assert_eq!(record.kind, "Person");

    let (status, body) = get(&app.router, "/transformers/people/no-such-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_str(&body).expect("error body should be JSON");
    assert_eq!(json["details"]["id"], "no-such-id");
}

#[tokio::test]
async fn test_reload_accepted_then_conflict() {
    let app = loaded_app(bob_and_fred()).await;

    // Hold the load gate so the next request sees a pass in flight.
    let running = app
        .cache
        .request_reload()
        .await
        .expect("first reload should be accepted");

    let (status, body, _) = send(&app.router, "POST", "/transformers/people/__reload").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("STATE_CONFLICT"));

    running
        .await
        .expect("reload task should not panic")
        .expect("reload should succeed");

    let (status, body, _) = send(&app.router, "POST", "/transformers/people/__reload").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let json: serde_json::Value = serde_json::from_str(&body).expect("reload body");
    assert_eq!(json["message"], "Reloading");
}

// ============================================================================
// HEALTH ROUTES
// ============================================================================

#[tokio::test]
async fn test_ping() {
    let app = test_app(Vec::new());
    let (status, body) = get(&app.router, "/__ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "pong");
}

#[tokio::test]
async fn test_build_info_and_legacy_aliases() {
    let app = test_app(Vec::new());

    for uri in ["/__build-info", "/build-info"] {
        let (status, body) = get(&app.router, uri).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        let json: serde_json::Value = serde_json::from_str(&body).expect("build info body");
        assert_eq!(json["name"], "termcache-api");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    let (status, body) = get(&app.router, "/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "pong");
}

#[tokio::test]
async fn test_gtg_needs_records() {
    let empty = loaded_app(Vec::new()).await;
    let (status, _) = get(&empty.router, "/__gtg").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let loaded = loaded_app(bob_and_fred()).await;
    let (status, body) = get(&loaded.router, "/__gtg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_health_report() {
    let app = loaded_app(bob_and_fred()).await;

    let (status, body) = get(&app.router, "/__health").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).expect("health body");
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["component"], "term-cache");
    assert_eq!(json["metadata"]["count"], 2);
    assert_eq!(json["metadata"]["snapshotReady"], true);
}
