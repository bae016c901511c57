//! Record bucket storage.
//!
//! [`CacheStore`] is the seam between the load/query machinery and the
//! embedded key-value engine; [`LmdbCacheStore`] is the production engine.
//! Store calls block on I/O, so async code goes through [`run_blocking`].

pub mod lmdb_store;
pub mod traits;

pub use lmdb_store::{LmdbCacheStore, RECORD_BUCKET};
pub use traits::CacheStore;

use termcache_core::{PipelineError, TermcacheResult};

/// Run a blocking store operation on the blocking pool.
///
/// A panic or cancellation of the blocking task is reported as
/// `PipelineError::TaskFailed` tagged with `task`.
pub(crate) async fn run_blocking<F, T>(task: &'static str, f: F) -> TermcacheResult<T>
where
    F: FnOnce() -> TermcacheResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PipelineError::TaskFailed {
            task: task.to_string(),
            reason: e.to_string(),
        })?
}
