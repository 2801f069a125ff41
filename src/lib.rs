//! crawl-history: success/failure history for resumable crawls
//!
//! This crate remembers, across crawl sessions, which requests already
//! succeeded and which failed, so a resumed crawl can skip finished work and
//! retry only what failed before. History is kept in memory and persisted to
//! one of three backends: a document store, a relational store, or an
//! append-only flat file.

pub mod config;
pub mod history;
pub mod request;
pub mod storage;

use thiserror::Error;

/// Main error type for crawl-history operations
///
/// Session operations on [`HistoryTracker`] never return errors; this type is
/// only produced while building a tracker or by the command-line front end.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Key codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while turning a request into a key or back
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Malformed request key: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for crawl-history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for key codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;

// Re-export commonly used types
pub use config::{Config, Provider};
pub use history::{HistoryStats, HistoryTracker};
pub use request::{Record, Request};
