//! The term cache facade: one store, one upstream, one readiness lock.

use std::sync::Arc;

use termcache_core::{
    CacheConfig, HealthCheck, QueryError, TermSource, TermcacheResult,
};
use tokio::task::JoinHandle;

use crate::cache::{run_blocking, CacheStore};
use crate::pipeline::{LoadPipeline, LoadReport};
use crate::query::QueryEngine;
use crate::readiness::{LoadPhase, Readiness, ReadinessState};

/// Component name used in health reports.
pub const HEALTH_COMPONENT: &str = "term-cache";

/// Cached snapshot of an upstream term source.
///
/// # Example
///
/// ```ignore
/// let cache = TermCache::new(Arc::new(store), Arc::new(source), &config);
/// cache.start()?;                         // initial pass in the background
/// let count = cache.query().count().await?;   // 0 until the pass completes
/// let mut records = cache.query().stream_all().await?;
/// ```
pub struct TermCache<S, U> {
    store: Arc<S>,
    readiness: Readiness,
    pipeline: LoadPipeline<S, U>,
    query: QueryEngine<S>,
}

impl<S: CacheStore, U: TermSource> TermCache<S, U> {
    pub fn new(store: Arc<S>, source: Arc<U>, config: &CacheConfig) -> Self {
        let readiness = Readiness::new();
        let pipeline = LoadPipeline::new(
            Arc::clone(&store),
            source,
            readiness.clone(),
            config,
        );
        let query = QueryEngine::new(Arc::clone(&store), readiness.clone(), config);

        Self {
            store,
            readiness,
            pipeline,
            query,
        }
    }

    pub fn query(&self) -> &QueryEngine<S> {
        &self.query
    }

    pub async fn is_ready(&self) -> ReadinessState {
        self.readiness.state().await
    }

    pub fn phase(&self) -> LoadPhase {
        self.readiness.phase()
    }

    /// Run a pass and wait for it, queueing behind any pass in flight.
    pub async fn load(&self) -> TermcacheResult<LoadReport> {
        self.pipeline.run().await
    }

    /// Start the initial pass in the background.
    pub fn start(&self) -> TermcacheResult<JoinHandle<TermcacheResult<LoadReport>>> {
        let permit = self.pipeline.try_acquire()?;
        Ok(self.pipeline.spawn(permit))
    }

    /// Schedule a reload and return without waiting for it.
    ///
    /// Fails with `ReloadInProgress` while a pass runs and with `Unavailable`
    /// when the store has never been opened (or has been closed).
    pub async fn request_reload(&self) -> TermcacheResult<JoinHandle<TermcacheResult<LoadReport>>> {
        let permit = match self.pipeline.try_acquire() {
            Ok(permit) => permit,
            Err(e) => {
                tracing::warn!("Reload rejected: a load pass is already running");
                return Err(e);
            }
        };

        // No pass is running, so no writer can be queued on the lock.
        if !self.readiness.state().await.opened {
            return Err(QueryError::Unavailable.into());
        }

        tracing::info!("Reload requested");
        Ok(self.pipeline.spawn(permit))
    }

    /// Health report for the cache.
    pub async fn health(&self) -> HealthCheck {
        let state = self.readiness.state().await;
        let phase = self.readiness.phase();

        let check = if state.is_serving() {
            match self.query.count().await {
                Ok(count) => HealthCheck::healthy(HEALTH_COMPONENT)
                    .with_metadata("count", serde_json::json!(count)),
                Err(e) => HealthCheck::degraded(HEALTH_COMPONENT, e.to_string()),
            }
        } else if state.opened {
            HealthCheck::degraded(HEALTH_COMPONENT, format!("snapshot not ready ({:?})", phase))
        } else {
            HealthCheck::unhealthy(HEALTH_COMPONENT, format!("store not open ({:?})", phase))
        };

        check
            .with_metadata("opened", serde_json::json!(state.opened))
            .with_metadata("snapshotReady", serde_json::json!(state.snapshot_ready))
            .with_metadata("phase", serde_json::json!(phase))
    }

    /// Wait for any pass in flight, then close the store.
    ///
    /// Fails with `StoreNotOpen` when the store was never opened.
    pub async fn shutdown(&self) -> TermcacheResult<()> {
        let _permit = self.pipeline.quiesce().await;
        let mut state = self.readiness.exclusive().await;
        state.readiness = ReadinessState::default();
        self.readiness.set_phase(LoadPhase::Closed);

        let store = Arc::clone(&self.store);
        let closed = run_blocking("close", move || store.close()).await;
        match &closed {
            Ok(()) => tracing::info!("Term cache closed"),
            Err(e) => tracing::error!(error = %e, "Term cache close failed"),
        }
        closed
    }
}
