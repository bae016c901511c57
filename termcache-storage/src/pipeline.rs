//! Load pipeline: paginate the upstream, transform pages concurrently and
//! funnel batches into a single store writer.
//!
//! ```text
//!  fetch_page(0) ──► producer task ──┐
//!  fetch_page(n) ──► producer task ──┼──► bounded mpsc ──► writer task ──► put_batch
//!  fetch_page(2n) ─► producer task ──┘      (batch_queue_capacity)
//! ```
//!
//! At most `batch_queue_capacity` pages are in flight between fetch and
//! queue, so a slow writer holds back pagination. A writer failure closes the
//! queue and pagination stops at the next page.
//!
//! A pass runs under the load gate, so at most one pass touches the store at
//! a time. The readiness lock is held exclusively only while flags change
//! and while the store is opened and reset.

use std::sync::Arc;
use std::time::{Duration, Instant};

use termcache_core::{
    CacheConfig, PipelineError, QueryError, Record, StorageError, TermSource, TermcacheError,
    TermcacheResult, Transformer,
};
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::cache::{run_blocking, CacheStore};
use crate::readiness::{LoadPhase, Readiness};

/// Summary of a completed load pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Non-empty pages fetched.
    pub pages: usize,
    /// Records written to the store.
    pub records: usize,
    /// Terms that arrived with an empty raw id.
    pub unidentified: usize,
    pub elapsed: Duration,
}

/// Exclusive right to run one load pass.
#[derive(Debug)]
pub struct LoadPermit {
    _gate: OwnedMutexGuard<()>,
}

pub struct LoadPipeline<S, U> {
    store: Arc<S>,
    source: Arc<U>,
    readiness: Readiness,
    transformer: Arc<Transformer>,
    page_size: usize,
    batch_queue_capacity: usize,
    gate: Arc<Mutex<()>>,
}

impl<S, U> Clone for LoadPipeline<S, U> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            source: Arc::clone(&self.source),
            readiness: self.readiness.clone(),
            transformer: Arc::clone(&self.transformer),
            page_size: self.page_size,
            batch_queue_capacity: self.batch_queue_capacity,
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<S: CacheStore, U: TermSource> LoadPipeline<S, U> {
    pub fn new(store: Arc<S>, source: Arc<U>, readiness: Readiness, config: &CacheConfig) -> Self {
        Self {
            store,
            source,
            readiness,
            transformer: Arc::new(config.transformer()),
            page_size: config.page_size,
            batch_queue_capacity: config.batch_queue_capacity,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Take the load gate without waiting.
    ///
    /// Fails with `QueryError::ReloadInProgress` while another pass holds it.
    pub fn try_acquire(&self) -> TermcacheResult<LoadPermit> {
        Arc::clone(&self.gate)
            .try_lock_owned()
            .map(|gate| LoadPermit { _gate: gate })
            .map_err(|_| QueryError::ReloadInProgress.into())
    }

    /// Wait until no pass is running and keep further passes out.
    pub async fn quiesce(&self) -> LoadPermit {
        LoadPermit {
            _gate: Arc::clone(&self.gate).lock_owned().await,
        }
    }

    /// Run one pass in the background under `permit`.
    pub fn spawn(&self, permit: LoadPermit) -> JoinHandle<TermcacheResult<LoadReport>> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            let report = pipeline.run_pass().await;
            drop(permit);
            report
        })
    }

    /// Run one pass to completion, waiting for any in-flight pass first.
    pub async fn run(&self) -> TermcacheResult<LoadReport> {
        let _permit = self.quiesce().await;
        self.run_pass().await
    }

    async fn run_pass(&self) -> TermcacheResult<LoadReport> {
        let started = Instant::now();
        tracing::info!(
            taxonomy = self.transformer.taxonomy(),
            page_size = self.page_size,
            "Load pass starting"
        );

        match self.load(started).await {
            Ok(report) => {
                tracing::info!(
                    pages = report.pages,
                    records = report.records,
                    unidentified = report.unidentified,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Load pass complete"
                );
                Ok(report)
            }
            Err(e) => {
                self.readiness.set_phase(LoadPhase::Failed);
                tracing::error!(error = %e, "Load pass failed");
                Err(e)
            }
        }
    }

    async fn load(&self, started: Instant) -> TermcacheResult<LoadReport> {
        self.prepare().await?;

        let (batches, queue) = mpsc::channel::<Vec<Record>>(self.batch_queue_capacity);
        let writer = tokio::spawn(write_batches(Arc::clone(&self.store), queue));
        let mut producers = JoinSet::new();

        let paginated = self.paginate(&batches, &mut producers).await;
        drop(batches);

        let pages = match paginated {
            Ok(pages) => pages,
            Err(e) => {
                producers.shutdown().await;
                // Let the writer drain what was already queued before reporting.
                match writer.await {
                    Ok(Ok(written)) => tracing::debug!(written, "Writer drained"),
                    Ok(Err(write_error)) => {
                        tracing::warn!(error = %write_error, "Writer failed before the pass aborted")
                    }
                    Err(join_error) => {
                        tracing::warn!(error = %join_error, "Writer task ended abnormally")
                    }
                }
                return Err(e);
            }
        };

        let mut unidentified = 0;
        let mut produced = Ok(());
        while let Some(joined) = producers.join_next().await {
            match joined {
                Ok(Ok(page_unidentified)) => unidentified += page_unidentified,
                Ok(Err(e)) => produced = produced.and(Err(e)),
                Err(e) => {
                    produced = produced.and(Err(task_failed("producer", e)));
                }
            }
        }

        let written = writer.await.map_err(|e| task_failed("writer", e))?;
        // A writer failure closes the queue, which is what producers then report.
        let records = written?;
        produced?;

        {
            let mut state = self.readiness.exclusive().await;
            state.readiness.snapshot_ready = true;
        }
        self.readiness.set_phase(LoadPhase::Ready);

        Ok(LoadReport {
            pages,
            records,
            unidentified,
            elapsed: started.elapsed(),
        })
    }

    /// Drop the old snapshot and make sure the store is open and empty.
    async fn prepare(&self) -> TermcacheResult<()> {
        let mut state = self.readiness.exclusive().await;
        state.readiness.snapshot_ready = false;

        if !state.readiness.opened {
            if state.open_failed {
                return Err(StorageError::NotOpen.into());
            }

            self.readiness.set_phase(LoadPhase::Opening);
            let store = Arc::clone(&self.store);
            if let Err(e) = run_blocking("open", move || store.open()).await {
                state.open_failed = true;
                return Err(e);
            }
            state.readiness.opened = true;
        }

        self.readiness.set_phase(LoadPhase::Loading);
        let store = Arc::clone(&self.store);
        run_blocking("reset_bucket", move || store.reset_bucket()).await
    }

    /// Fetch pages until an empty one, spawning a producer per page.
    /// Returns the number of non-empty pages.
    ///
    /// Stops early without error once the writer has dropped the queue; the
    /// writer's own result carries the failure.
    async fn paginate(
        &self,
        batches: &mpsc::Sender<Vec<Record>>,
        producers: &mut JoinSet<TermcacheResult<usize>>,
    ) -> TermcacheResult<usize> {
        let in_flight = Arc::new(Semaphore::new(self.batch_queue_capacity));
        let mut pages = 0;

        loop {
            // Released once the page's batch is queued.
            let slot = Arc::clone(&in_flight)
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::TaskFailed {
                    task: "paginate".to_string(),
                    reason: e.to_string(),
                })?;
            if batches.is_closed() {
                tracing::warn!(pages, "Batch writer stopped, ending pagination");
                return Ok(pages);
            }

            let offset = pages * self.page_size;
            let terms = self.source.fetch_page(offset).await?;
            if terms.is_empty() {
                tracing::debug!(offset, "Upstream exhausted");
                return Ok(pages);
            }

            tracing::debug!(offset, terms = terms.len(), "Fetched page");
            pages += 1;

            let transformer = Arc::clone(&self.transformer);
            let batches = batches.clone();
            producers.spawn(async move {
                let page = transformer.transform_page(&terms);
                if page.unidentified > 0 {
                    tracing::warn!(
                        offset,
                        unidentified = page.unidentified,
                        "Terms without a raw identifier"
                    );
                }
                if !page.records.is_empty() {
                    batches
                        .send(page.records)
                        .await
                        .map_err(|_| PipelineError::TaskFailed {
                            task: "producer".to_string(),
                            reason: "batch writer stopped".to_string(),
                        })?;
                }
                drop(slot);
                Ok::<_, TermcacheError>(page.unidentified)
            });
        }
    }
}

/// Single consumer: write every queued batch, one transaction each.
async fn write_batches<S: CacheStore>(
    store: Arc<S>,
    mut queue: mpsc::Receiver<Vec<Record>>,
) -> TermcacheResult<usize> {
    let mut written = 0;

    while let Some(batch) = queue.recv().await {
        let size = batch.len();
        let store = Arc::clone(&store);
        run_blocking("put_batch", move || store.put_batch(&batch)).await?;
        written += size;
        tracing::debug!(batch = size, written, "Batch written");
    }

    Ok(written)
}

fn task_failed(task: &str, e: tokio::task::JoinError) -> TermcacheError {
    PipelineError::TaskFailed {
        task: task.to_string(),
        reason: e.to_string(),
    }
    .into()
}
