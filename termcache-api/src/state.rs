//! Shared application state for route handlers.

use std::sync::Arc;

use termcache_storage::TermCache;

/// Handle to the term cache, cloned into every handler.
pub struct AppState<S, U> {
    pub cache: Arc<TermCache<S, U>>,
}

impl<S, U> AppState<S, U> {
    pub fn new(cache: Arc<TermCache<S, U>>) -> Self {
        Self { cache }
    }
}

impl<S, U> Clone for AppState<S, U> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}
