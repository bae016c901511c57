//! LMDB-backed record store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to keep the record snapshot
//! in a memory-mapped, ordered key-value store.
//!
//! # Layout
//!
//! One named database (`record`) inside the environment. Keys are the UTF-8
//! bytes of the record id, values are the JSON serialized [`Record`].
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions with a single writer and many readers:
//! - Read transactions for `get`, `scan` and `count`
//! - One write transaction per `reset_bucket` and per `put_batch`

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use termcache_core::{CacheConfig, Record, StorageError, TermcacheResult};

use super::traits::CacheStore;

/// Name of the database holding the record bucket.
pub const RECORD_BUCKET: &str = "record";

#[derive(Clone)]
struct LmdbHandle {
    env: Env,
    db: Database<Bytes, Bytes>,
}

/// LMDB-backed record store.
///
/// # Example
///
/// ```ignore
/// use termcache_storage::cache::{CacheStore, LmdbCacheStore};
///
/// let store = LmdbCacheStore::new("/tmp/termcache", 64, Duration::from_secs(5));
/// store.open()?;
/// store.reset_bucket()?;
/// store.put_batch(&records)?;
/// let bob = store.get("7a0c21ad-3747-39b4-9bed-bf4bf21a619d")?;
/// ```
pub struct LmdbCacheStore {
    path: PathBuf,
    map_size_mb: usize,
    close_timeout: Duration,
    /// `None` until opened, and again after close.
    handle: RwLock<Option<LmdbHandle>>,
}

impl LmdbCacheStore {
    /// Create an unopened store rooted at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    /// * `close_timeout` - How long `close` waits for the environment to be released
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize, close_timeout: Duration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            map_size_mb: max_size_mb,
            close_timeout,
            handle: RwLock::new(None),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(&config.cache_path, config.map_size_mb, config.close_timeout)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn handle(&self) -> TermcacheResult<LmdbHandle> {
        let slot = self.handle.read().map_err(|_| StorageError::LockPoisoned)?;
        slot.clone().ok_or_else(|| StorageError::NotOpen.into())
    }

    fn unavailable(&self, reason: impl ToString) -> StorageError {
        StorageError::Unavailable {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

fn txn_error(e: heed::Error) -> StorageError {
    StorageError::TransactionFailed {
        reason: e.to_string(),
    }
}

fn decode(key: &[u8], value: &[u8]) -> TermcacheResult<Record> {
    serde_json::from_slice(value).map_err(|e| {
        StorageError::Deserialization {
            key: String::from_utf8_lossy(key).into_owned(),
            reason: e.to_string(),
        }
        .into()
    })
}

impl CacheStore for LmdbCacheStore {
    fn open(&self) -> TermcacheResult<()> {
        let mut slot = self.handle.write().map_err(|_| StorageError::LockPoisoned)?;
        if slot.is_some() {
            return Ok(());
        }

        // Ensure directory exists
        std::fs::create_dir_all(&self.path).map_err(|e| self.unavailable(e))?;

        // Open LMDB environment
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(self.map_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(&self.path)
        }
        .map_err(|e| self.unavailable(e))?;

        let mut wtxn = env.write_txn().map_err(txn_error)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some(RECORD_BUCKET))
            .map_err(|e| self.unavailable(e))?;
        wtxn.commit().map_err(txn_error)?;

        tracing::debug!(path = %self.path.display(), "Cache store opened");
        *slot = Some(LmdbHandle { env, db });
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.handle
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    fn reset_bucket(&self) -> TermcacheResult<()> {
        let handle = self.handle()?;
        let mut wtxn = handle.env.write_txn().map_err(txn_error)?;
        handle.db.clear(&mut wtxn).map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(())
    }

    fn put_batch(&self, records: &[Record]) -> TermcacheResult<()> {
        let handle = self.handle()?;
        let mut wtxn = handle.env.write_txn().map_err(txn_error)?;

        for record in records {
            let value = serde_json::to_vec(record).map_err(|e| StorageError::Serialization {
                id: record.id.clone(),
                reason: e.to_string(),
            })?;
            handle
                .db
                .put(&mut wtxn, record.id.as_bytes(), value.as_slice())
                .map_err(txn_error)?;
        }

        wtxn.commit().map_err(txn_error)?;
        Ok(())
    }

    fn get(&self, id: &str) -> TermcacheResult<Option<Record>> {
        let handle = self.handle()?;
        let rtxn = handle.env.read_txn().map_err(txn_error)?;

        let found = handle.db.get(&rtxn, id.as_bytes()).map_err(txn_error)?;
        found.map(|bytes| decode(id.as_bytes(), bytes)).transpose()
    }

    fn scan(&self, visit: &mut dyn FnMut(Record) -> ControlFlow<()>) -> TermcacheResult<()> {
        let handle = self.handle()?;
        let rtxn = handle.env.read_txn().map_err(txn_error)?;

        for entry in handle.db.iter(&rtxn).map_err(txn_error)? {
            let (key, value) = entry.map_err(txn_error)?;
            let record = decode(key, value)?;
            if visit(record).is_break() {
                break;
            }
        }

        Ok(())
    }

    fn count(&self) -> TermcacheResult<u64> {
        let handle = self.handle()?;
        let rtxn = handle.env.read_txn().map_err(txn_error)?;
        Ok(handle.db.len(&rtxn).map_err(txn_error)?)
    }

    fn close(&self) -> TermcacheResult<()> {
        let handle = {
            let mut slot = self.handle.write().map_err(|_| StorageError::LockPoisoned)?;
            slot.take().ok_or(StorageError::NotOpen)?
        };

        let LmdbHandle { env, .. } = handle;
        let closing = env.prepare_for_closing();
        if closing.wait_timeout(self.close_timeout) {
            tracing::debug!(path = %self.path.display(), "Cache store closed");
            Ok(())
        } else {
            Err(StorageError::CloseFailed {
                reason: format!(
                    "environment still referenced after {:?}",
                    self.close_timeout
                ),
            }
            .into())
        }
    }
}
