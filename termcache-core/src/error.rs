//! Error types for termcache operations

use thiserror::Error;

/// Cache store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Store unavailable at {path}: {reason}")]
    Unavailable { path: String, reason: String },

    #[error("Store not open")]
    NotOpen,

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Serialization failed for {id}: {reason}")]
    Serialization { id: String, reason: String },

    #[error("Deserialization failed for key {key}: {reason}")]
    Deserialization { key: String, reason: String },

    #[error("Store close failed: {reason}")]
    CloseFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Upstream source errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Upstream fetch failed at offset {offset}: {reason}")]
    FetchFailed { offset: usize, reason: String },
}

/// Query-side errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Cache unavailable: snapshot not ready")]
    Unavailable,

    #[error("A reload is already in progress")]
    ReloadInProgress,
}

/// Load pipeline task errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Load task {task} failed: {reason}")]
    TaskFailed { task: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all termcache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TermcacheError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl TermcacheError {
    /// True when the error means "not ready yet" rather than a failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, TermcacheError::Query(QueryError::Unavailable))
    }
}

/// Result type alias for termcache operations.
pub type TermcacheResult<T> = Result<T, TermcacheError>;

// =============================================================================
// TESTS
// =============================================================================
