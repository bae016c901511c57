//! Readiness coordination between the load pipeline and queries.
//!
//! One write-preferring `tokio::sync::RwLock` guards the `{opened,
//! snapshot_ready}` pair. The pipeline takes it exclusively to flip flags
//! and to open/reset the store; queries take it shared for their whole store
//! interaction. A query never reads the flags and then acts on them later:
//! [`Readiness::serving`] checks and holds in one step.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use termcache_core::{QueryError, TermcacheResult};
use tokio::sync::{OwnedRwLockReadGuard, RwLock, RwLockWriteGuard};

/// Snapshot of the readiness flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessState {
    /// The store is open and the bucket exists.
    pub opened: bool,
    /// The last load pass completed without error.
    pub snapshot_ready: bool,
}

impl ReadinessState {
    /// Queries are answered only in this state.
    pub fn is_serving(&self) -> bool {
        self.opened && self.snapshot_ready
    }
}

/// Load pipeline lifecycle, for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPhase {
    #[default]
    Empty,
    Opening,
    Loading,
    Ready,
    Failed,
    Closed,
}

/// State behind the readiness lock.
#[derive(Debug, Default)]
pub(crate) struct CacheState {
    pub(crate) readiness: ReadinessState,
    /// A cold-start open failed; the store is never re-opened.
    pub(crate) open_failed: bool,
}

/// Proof that the snapshot was ready when acquired. Holding it keeps any
/// load pass from flipping flags or resetting the bucket.
pub struct ServingGuard {
    _state: OwnedRwLockReadGuard<CacheState>,
}

impl std::fmt::Debug for ServingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServingGuard").finish_non_exhaustive()
    }
}

/// Shared handle to the readiness lock.
#[derive(Debug, Clone, Default)]
pub struct Readiness {
    state: Arc<RwLock<CacheState>>,
    // Kept outside the RwLock so it can be read while a writer is queued.
    phase: Arc<Mutex<LoadPhase>>,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current flags, read under the shared lock.
    pub async fn state(&self) -> ReadinessState {
        self.state.read().await.readiness
    }

    /// Check readiness and keep the shared lock held on success.
    ///
    /// Fails with `QueryError::Unavailable` when the snapshot is not ready.
    pub async fn serving(&self) -> TermcacheResult<ServingGuard> {
        let state = Arc::clone(&self.state).read_owned().await;
        if state.readiness.is_serving() {
            Ok(ServingGuard { _state: state })
        } else {
            Err(QueryError::Unavailable.into())
        }
    }

    pub(crate) async fn exclusive(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().await
    }

    pub fn phase(&self) -> LoadPhase {
        match self.phase.lock() {
            Ok(phase) => *phase,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub(crate) fn set_phase(&self, next: LoadPhase) {
        let mut phase = match self.phase.lock() {
            Ok(phase) => phase,
            Err(poisoned) => poisoned.into_inner(),
        };
        tracing::debug!(from = ?*phase, to = ?next, "Load phase changed");
        *phase = next;
    }
}
