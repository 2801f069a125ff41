//! Storage module for persisting crawl history
//!
//! This module holds the three history backends and the closed set that
//! selects between them:
//! - a document store, reached through the [`DocumentStore`] driver trait
//! - a relational store on SQLite
//! - an append-only flat file in the cache directory

mod document;
mod file;
mod schema;
mod sqlite;
mod traits;

pub use document::{DocumentHistoryStore, DocumentStore, MemoryDocumentStore};
pub use file::FileHistoryStore;
pub use sqlite::SqliteHistoryStore;
pub use traits::{HistoryBackend, SpiderBuckets, StorageError, StorageResult};

use crate::config::{Config, Provider};
use crate::request::{decode_request, spider_name_of};
use std::path::Path;
use tracing::{debug, warn};

/// The backends a tracker can persist to
///
/// The flat file backend is always present. The relational and document
/// backends exist only when configured.
pub struct Backends {
    file: FileHistoryStore,
    relational: Option<SqliteHistoryStore>,
    document: Option<DocumentHistoryStore>,
}

impl Backends {
    /// Creates a backend set with only the flat file backend
    pub fn new(file: FileHistoryStore) -> Self {
        Self {
            file,
            relational: None,
            document: None,
        }
    }

    /// Builds the backend set described by the configuration
    ///
    /// Opens the relational database when a `[relational]` section is present.
    /// A document store has no configuration of its own and is attached with
    /// [`Backends::with_document`].
    pub fn from_config(config: &Config) -> StorageResult<Self> {
        let mut backends = Self::new(FileHistoryStore::from_config(&config.history));

        if let Some(relational) = &config.relational {
            let store = SqliteHistoryStore::from_config(
                Path::new(&relational.database_path),
                &config.history,
            )?;
            debug!("Opened relational history at {}", relational.database_path);
            backends.relational = Some(store);
        }

        Ok(backends)
    }

    pub fn with_relational(mut self, store: SqliteHistoryStore) -> Self {
        self.relational = Some(store);
        self
    }

    pub fn with_document(mut self, store: DocumentHistoryStore) -> Self {
        self.document = Some(store);
        self
    }

    /// Returns the backend for a provider
    ///
    /// # Returns
    ///
    /// * `Ok(backend)` - The configured backend
    /// * `Err(StorageError::Unavailable)` - The provider has no backend attached
    pub fn select(&mut self, provider: Provider) -> StorageResult<&mut dyn HistoryBackend> {
        match provider {
            Provider::File => Ok(&mut self.file),
            Provider::Relational => self
                .relational
                .as_mut()
                .map(|store| store as &mut dyn HistoryBackend)
                .ok_or_else(|| {
                    StorageError::Unavailable("relational store is not configured".to_string())
                }),
            Provider::Document => self
                .document
                .as_mut()
                .map(|store| store as &mut dyn HistoryBackend)
                .ok_or_else(|| {
                    StorageError::Unavailable("document store is not configured".to_string())
                }),
        }
    }
}

/// Files failure keys under the spider decoded from each key
///
/// Keys that do not decode to a request are dropped and reported as one
/// aggregate count.
pub(crate) fn group_by_spider<I>(keys: I) -> SpiderBuckets
where
    I: IntoIterator<Item = String>,
{
    let mut buckets = SpiderBuckets::new();
    let mut skipped = 0usize;

    for key in keys {
        match decode_request(&key) {
            Ok(request) => {
                buckets
                    .entry(spider_name_of(&request).to_string())
                    .or_default()
                    .insert(key);
            }
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("Skipped {} undecodable failure records", skipped);
    }

    buckets
}
