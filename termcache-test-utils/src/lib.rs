//! termcache Test Utilities
//!
//! Shared test infrastructure for the termcache workspace:
//! - Proptest generators for upstream terms and page sets
//! - A scriptable in-memory upstream source
//! - Fixtures for the common Bob/Fred scenario
//! - Assertions for termcache error variants

pub use termcache_core::{
    CacheConfig, QueryError, RawTerm, Record, StorageError, TermSource, TermcacheError,
    TermcacheResult, UpstreamError,
};

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

// ============================================================================
// MOCK UPSTREAM SOURCE
// ============================================================================

/// In-memory upstream serving fixed pages.
///
/// `fetch_page(offset)` serves page `offset / page_size` and an empty page
/// past the end. A page index can be scripted to fail, the page set can be
/// swapped between passes, and fetches can be held behind a [`PageGate`].
#[derive(Debug)]
pub struct PagedTermSource {
    page_size: usize,
    pages: Mutex<Vec<Vec<RawTerm>>>,
    fail_at: Mutex<Option<usize>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

/// Releases fetches held by a gated [`PagedTermSource`], one permit per fetch.
#[derive(Debug, Clone)]
pub struct PageGate {
    permits: Arc<Semaphore>,
}

impl PageGate {
    /// Let `fetches` more page requests through.
    pub fn release(&self, fetches: usize) {
        self.permits.add_permits(fetches);
    }

    /// Stop holding fetches back.
    pub fn open(&self) {
        self.permits.add_permits(1 << 20);
    }
}

impl PagedTermSource {
    pub fn new(page_size: usize, pages: Vec<Vec<RawTerm>>) -> Self {
        Self {
            page_size: page_size.max(1),
            pages: Mutex::new(pages),
            fail_at: Mutex::new(None),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Split `terms` into pages of `page_size`.
    pub fn from_terms(page_size: usize, terms: Vec<RawTerm>) -> Self {
        Self::new(page_size, fixtures::paginate(terms, page_size))
    }

    /// Fail every fetch of page `index`.
    pub fn failing_at(self, index: usize) -> Self {
        self.fail_page(Some(index));
        self
    }

    /// Hold every fetch until the returned gate releases it.
    pub fn gated(mut self) -> (Self, PageGate) {
        let permits = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&permits));
        (self, PageGate { permits })
    }

    pub fn fail_page(&self, index: Option<usize>) {
        *self.fail_at.lock().expect("fail_at lock poisoned") = index;
    }

    /// Replace the served pages, e.g. to simulate an upstream change between passes.
    pub fn set_pages(&self, pages: Vec<Vec<RawTerm>>) {
        *self.pages.lock().expect("pages lock poisoned") = pages;
    }

    /// Number of `fetch_page` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Total terms across all pages.
    pub fn total_terms(&self) -> usize {
        self.pages
            .lock()
            .expect("pages lock poisoned")
            .iter()
            .map(Vec::len)
            .sum()
    }
}

#[async_trait]
impl TermSource for PagedTermSource {
    async fn fetch_page(&self, offset: usize) -> Result<Vec<RawTerm>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| UpstreamError::FetchFailed {
                    offset,
                    reason: e.to_string(),
                })?
                .forget();
        }

        let index = offset / self.page_size;
        if *self.fail_at.lock().expect("fail_at lock poisoned") == Some(index) {
            return Err(UpstreamError::FetchFailed {
                offset,
                reason: "scripted failure".to_string(),
            });
        }

        Ok(self
            .pages
            .lock()
            .expect("pages lock poisoned")
            .get(index)
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for termcache inputs.

    use super::*;
    use proptest::prelude::*;

    /// Generate a taxonomy namespace.
    pub fn arb_taxonomy() -> impl Strategy<Value = String> {
        "[A-Za-z_]{1,16}"
    }

    /// Generate a raw upstream identifier (never empty).
    pub fn arb_raw_id() -> impl Strategy<Value = String> {
        "[a-z0-9]{1,12}"
    }

    /// Generate an upstream term with up to four aliases.
    pub fn arb_raw_term() -> impl Strategy<Value = RawTerm> {
        (
            arb_raw_id(),
            "[A-Z][a-z]{0,12}",
            prop::collection::vec("[A-Za-z ]{1,10}", 0..4),
        )
            .prop_map(|(raw_id, name, aliases)| RawTerm::new(raw_id, name).with_aliases(aliases))
    }

    /// Generate a page size and pages of terms with distinct raw ids.
    ///
    /// Every page but the last is full; the set may be empty.
    pub fn arb_pages() -> impl Strategy<Value = (usize, Vec<Vec<RawTerm>>)> {
        (prop::collection::btree_set(arb_raw_id(), 0..40), 1usize..8).prop_map(
            |(ids, page_size)| {
                let terms = ids
                    .into_iter()
                    .map(|id| {
                        let name = id.to_uppercase();
                        RawTerm::new(id, name)
                    })
                    .collect();
                (page_size, fixtures::paginate(terms, page_size))
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Taxonomy of the Bob/Fred scenario.
    pub const TAXONOMY: &str = "taxonomy_string";

    /// Record id of `bob()` under [`TAXONOMY`].
    pub const BOB_ID: &str = "7a0c21ad-3747-39b4-9bed-bf4bf21a619d";

    /// Record id of `fred()` under [`TAXONOMY`].
    pub const FRED_ID: &str = "eeaff24d-82f1-3f78-913f-24641e428bfd";

    pub fn bob() -> RawTerm {
        RawTerm::new("bob", "Bob")
    }

    pub fn fred() -> RawTerm {
        RawTerm::new("fred", "Fred")
    }

    pub fn bob_and_fred() -> Vec<RawTerm> {
        vec![bob(), fred()]
    }

    /// `count` terms with distinct raw ids `term-0`, `term-1`, ...
    pub fn numbered_terms(count: usize) -> Vec<RawTerm> {
        (0..count)
            .map(|i| RawTerm::new(format!("term-{}", i), format!("Term {}", i)))
            .collect()
    }

    /// Split terms into pages of `page_size`.
    pub fn paginate(terms: Vec<RawTerm>, page_size: usize) -> Vec<Vec<RawTerm>> {
        terms
            .chunks(page_size.max(1))
            .map(<[RawTerm]>::to_vec)
            .collect()
    }

    /// Small cache configuration rooted at `dir`.
    pub fn test_config(dir: &Path, page_size: usize) -> CacheConfig {
        CacheConfig {
            cache_path: dir.to_path_buf(),
            map_size_mb: 10,
            close_timeout: Duration::from_secs(5),
            page_size,
            batch_queue_capacity: 2,
            stream_buffer: 4,
            base_url: "http://localhost:8080/transformers/people".to_string(),
            taxonomy: TAXONOMY.to_string(),
            ..CacheConfig::default()
        }
    }

    /// [`test_config`] in a fresh temporary directory.
    pub fn temp_cache_config(page_size: usize) -> (CacheConfig, TempDir) {
        let dir = TempDir::new().expect("TempDir creation should succeed");
        (test_config(dir.path(), page_size), dir)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for termcache-specific error variants.

    use super::*;

    /// Assert that a TermcacheResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &TermcacheResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a query was refused because the snapshot is not ready.
    #[track_caller]
    pub fn assert_unavailable<T: std::fmt::Debug>(result: &TermcacheResult<T>) {
        match result {
            Err(TermcacheError::Query(QueryError::Unavailable)) => {}
            other => panic!("Expected Unavailable, got: {:?}", other),
        }
    }

    /// Assert that a reload was refused because one is running.
    #[track_caller]
    pub fn assert_reload_in_progress<T: std::fmt::Debug>(result: &TermcacheResult<T>) {
        match result {
            Err(TermcacheError::Query(QueryError::ReloadInProgress)) => {}
            other => panic!("Expected ReloadInProgress, got: {:?}", other),
        }
    }

    /// Assert that a store operation ran before the store was opened.
    #[track_caller]
    pub fn assert_not_open<T: std::fmt::Debug>(result: &TermcacheResult<T>) {
        match result {
            Err(TermcacheError::Storage(StorageError::NotOpen)) => {}
            other => panic!("Expected StoreNotOpen, got: {:?}", other),
        }
    }

    /// Assert that a pass failed fetching the page at `offset`.
    #[track_caller]
    pub fn assert_fetch_failed<T: std::fmt::Debug>(result: &TermcacheResult<T>, offset: usize) {
        match result {
            Err(TermcacheError::Upstream(UpstreamError::FetchFailed { offset: got, .. })) => {
                assert_eq!(*got, offset, "Wrong failing offset");
            }
            other => panic!("Expected FetchFailed at {}, got: {:?}", offset, other),
        }
    }
}
