//! Store wrapper that counts access and can slow down or fail writes and scans.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use termcache_core::{Record, StorageError, TermcacheResult};
use termcache_storage::{CacheStore, LmdbCacheStore};

pub struct ProbeStore {
    inner: LmdbCacheStore,
    reads: AtomicUsize,
    batches: AtomicUsize,
    /// Fail a scan after this many records have been visited.
    fail_scan_after: Option<usize>,
    write_delay: Option<Duration>,
    fail_writes: bool,
}

impl ProbeStore {
    pub fn new(inner: LmdbCacheStore) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
            fail_scan_after: None,
            write_delay: None,
            fail_writes: false,
        }
    }

    /// Sleep for `delay` before every batch write.
    pub fn slow_writes(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Reject every batch write.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn failing_scan_after(mut self, records: usize) -> Self {
        self.fail_scan_after = Some(records);
        self
    }

    /// Number of `get`, `scan` and `count` calls.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `put_batch` calls, failed ones included.
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

impl CacheStore for ProbeStore {
    fn open(&self) -> TermcacheResult<()> {
        self.inner.open()
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn reset_bucket(&self) -> TermcacheResult<()> {
        self.inner.reset_bucket()
    }

    fn put_batch(&self, records: &[Record]) -> TermcacheResult<()> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.write_delay {
            std::thread::sleep(delay);
        }
        if self.fail_writes {
            return Err(StorageError::TransactionFailed {
                reason: "disk full".to_string(),
            }
            .into());
        }
        self.inner.put_batch(records)
    }

    fn get(&self, id: &str) -> TermcacheResult<Option<Record>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id)
    }

    fn scan(&self, visit: &mut dyn FnMut(Record) -> ControlFlow<()>) -> TermcacheResult<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let Some(limit) = self.fail_scan_after else {
            return self.inner.scan(visit);
        };

        let mut visited = 0;
        self.inner.scan(&mut |record| {
            if visited == limit {
                return ControlFlow::Break(());
            }
            visited += 1;
            visit(record)
        })?;

        if visited == limit {
            Err(StorageError::TransactionFailed {
                reason: "cursor lost".to_string(),
            }
            .into())
        } else {
            Ok(())
        }
    }

    fn count(&self) -> TermcacheResult<u64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.count()
    }

    fn close(&self) -> TermcacheResult<()> {
        self.inner.close()
    }
}
