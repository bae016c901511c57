//! Read side of the cache.
//!
//! Every operation first takes a [`ServingGuard`](crate::readiness::ServingGuard);
//! without one it reports `Unavailable` (or 0 for `count`) and never touches
//! the store. Streams keep the guard inside the scanning task until the scan
//! ends or the consumer goes away, so a reload cannot reset the bucket under
//! an open stream.

use std::ops::ControlFlow;
use std::sync::Arc;

use termcache_core::{
    CacheConfig, PipelineError, Record, RecordKey, RecordLink, TermcacheResult,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::cache::{run_blocking, CacheStore};
use crate::readiness::{Readiness, ReadinessState};

/// Lazily produced query results. A failure mid-scan is delivered as a final
/// `Err` item before the stream ends.
pub type RecordStream<T> = ReceiverStream<TermcacheResult<T>>;

pub struct QueryEngine<S> {
    store: Arc<S>,
    readiness: Readiness,
    base_url: Arc<str>,
    stream_buffer: usize,
}

impl<S> Clone for QueryEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            readiness: self.readiness.clone(),
            base_url: Arc::clone(&self.base_url),
            stream_buffer: self.stream_buffer,
        }
    }
}

impl<S: CacheStore> QueryEngine<S> {
    pub fn new(store: Arc<S>, readiness: Readiness, config: &CacheConfig) -> Self {
        Self {
            store,
            readiness,
            base_url: Arc::from(config.base_url.as_str()),
            stream_buffer: config.stream_buffer,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn is_ready(&self) -> ReadinessState {
        self.readiness.state().await
    }

    /// Number of cached records; 0 when the snapshot is not ready.
    pub async fn count(&self) -> TermcacheResult<u64> {
        let serving = match self.readiness.serving().await {
            Ok(serving) => serving,
            Err(e) if e.is_unavailable() => return Ok(0),
            Err(e) => return Err(e),
        };

        let store = Arc::clone(&self.store);
        run_blocking("count", move || {
            let _serving = serving;
            store.count()
        })
        .await
    }

    /// Point lookup. `Ok(None)` when the id is not cached.
    pub async fn get_by_id(&self, id: &str) -> TermcacheResult<Option<Record>> {
        let serving = self.readiness.serving().await?;

        let store = Arc::clone(&self.store);
        let id = id.to_string();
        run_blocking("get", move || {
            let _serving = serving;
            store.get(&id)
        })
        .await
    }

    /// Every record, in key order.
    pub async fn stream_all(&self) -> TermcacheResult<RecordStream<Record>> {
        self.stream_projected(|record| record).await
    }

    /// Every record id, in key order.
    pub async fn stream_ids(&self) -> TermcacheResult<RecordStream<RecordKey>> {
        self.stream_projected(RecordKey::from).await
    }

    /// Every record as a link under the configured base URL, in key order.
    pub async fn stream_links(&self) -> TermcacheResult<RecordStream<RecordLink>> {
        let base_url = Arc::clone(&self.base_url);
        self.stream_projected(move |record| record.link(&base_url))
            .await
    }

    async fn stream_projected<T, F>(&self, project: F) -> TermcacheResult<RecordStream<T>>
    where
        T: Send + 'static,
        F: Fn(Record) -> T + Send + 'static,
    {
        let serving = self.readiness.serving().await?;
        let (items, stream) = mpsc::channel(self.stream_buffer);
        let on_panic = items.clone();
        let store = Arc::clone(&self.store);

        let scan = tokio::task::spawn_blocking(move || {
            let _serving = serving;
            let mut consumer_gone = false;

            let scanned = store.scan(&mut |record| {
                // Blocks while the buffer is full.
                if items.blocking_send(Ok(project(record))).is_err() {
                    consumer_gone = true;
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            });

            match scanned {
                Ok(()) if consumer_gone => tracing::debug!("Stream consumer went away mid-scan"),
                Ok(()) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Scan failed mid-stream");
                    let _ = items.blocking_send(Err(e));
                }
            }
        });

        tokio::spawn(async move {
            if let Err(e) = scan.await {
                let failure = PipelineError::TaskFailed {
                    task: "scan".to_string(),
                    reason: e.to_string(),
                };
                let _ = on_panic.send(Err(failure.into())).await;
            }
        });

        Ok(ReceiverStream::new(stream))
    }
}
