//! Storage traits and error types
//!
//! This module defines the trait interface for history backends and
//! associated error types.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Failure keys grouped by the spider that produced them
pub type SpiderBuckets = HashMap<String, HashSet<String>>;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for history backend implementations
///
/// A backend holds two ledgers, one for successes and one for failures.
/// Writes must be idempotent per key: a flush that failed halfway is retried
/// with the same keys, some of which may already be stored.
pub trait HistoryBackend: Send {
    /// Loads every persisted success key
    fn load_success(&mut self) -> StorageResult<HashSet<String>>;

    /// Loads every persisted failure key, grouped by spider
    ///
    /// Records that cannot be attributed to a spider are skipped.
    fn load_failure(&mut self) -> StorageResult<SpiderBuckets>;

    /// Persists success keys, returning how many were written
    fn persist_success(&mut self, keys: &HashSet<String>) -> StorageResult<usize>;

    /// Persists failure keys for every spider, returning how many were written
    fn persist_failure(&mut self, buckets: &SpiderBuckets) -> StorageResult<usize>;
}
