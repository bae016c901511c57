//! Cache store trait.
//!
//! The store is a single logical bucket of records keyed by record id. All
//! methods block on storage I/O; async callers run them on the blocking pool.

use std::ops::ControlFlow;

use termcache_core::{Record, TermcacheResult};

/// Ordered, byte-keyed record store with cursor and batch-write primitives.
///
/// # Implementation Requirements
///
/// - `open` is idempotent; every other method except `close` fails with
///   `StorageError::NotOpen` before a successful `open`
/// - `put_batch` commits the whole slice atomically
/// - `scan` visits records in ascending key order until the visitor breaks
/// - `count` must not scan the bucket
/// - Implementations must be `Send + Sync + 'static` to cross task boundaries
pub trait CacheStore: Send + Sync + 'static {
    /// Open the underlying store and make sure the bucket exists.
    fn open(&self) -> TermcacheResult<()>;

    /// Whether `open` has succeeded and `close` has not been called since.
    fn is_open(&self) -> bool;

    /// Drop every record in the bucket, leaving it empty.
    fn reset_bucket(&self) -> TermcacheResult<()>;

    /// Write one batch of records in a single transaction.
    fn put_batch(&self, records: &[Record]) -> TermcacheResult<()>;

    /// Point lookup. `Ok(None)` when the key is absent.
    fn get(&self, id: &str) -> TermcacheResult<Option<Record>>;

    /// Forward-only cursor traversal in key order.
    fn scan(&self, visit: &mut dyn FnMut(Record) -> ControlFlow<()>) -> TermcacheResult<()>;

    /// Number of keys in the bucket, from store statistics.
    fn count(&self) -> TermcacheResult<u64>;

    /// Close the store. Fails with `StorageError::NotOpen` when not open.
    fn close(&self) -> TermcacheResult<()>;
}
