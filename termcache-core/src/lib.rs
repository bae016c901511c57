//! termcache Core - Entity Types
//!
//! Pure data structures shared by every other crate: the raw upstream term,
//! the canonical cached record, the error taxonomy, configuration and the
//! upstream source seam. The only behavior here is the deterministic
//! term-to-record transformation.

pub mod config;
pub mod entities;
pub mod error;
pub mod health;
pub mod identity;
pub mod source;
pub mod transform;

pub use config::CacheConfig;
pub use entities::{RawTerm, Record, RecordId, RecordKey, RecordLink, SourceRefs};
pub use error::{
    ConfigError, PipelineError, QueryError, StorageError, TermcacheError, TermcacheResult,
    UpstreamError,
};
pub use health::{HealthCheck, HealthStatus};
pub use identity::{derive_record_id, source_identifier};
pub use source::TermSource;
pub use transform::Transformer;
