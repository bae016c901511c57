//! termcache Storage - LMDB Snapshot, Load Pipeline and Queries
//!
//! Keeps a complete snapshot of an upstream term source in an LMDB bucket.
//! A load pass rebuilds the bucket from scratch; queries are only answered
//! once a pass has completed, and streaming queries hold off the next reset
//! until they finish.

pub mod cache;
pub mod pipeline;
pub mod query;
pub mod readiness;
pub mod term_cache;

pub use cache::{CacheStore, LmdbCacheStore, RECORD_BUCKET};
pub use pipeline::{LoadPermit, LoadPipeline, LoadReport};
pub use query::{QueryEngine, RecordStream};
pub use readiness::{LoadPhase, Readiness, ReadinessState, ServingGuard};
pub use term_cache::{TermCache, HEALTH_COMPONENT};
