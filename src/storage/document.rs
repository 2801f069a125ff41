//! Document store history backend
//!
//! History documents carry only an id: the record key. Network drivers plug
//! in through [`DocumentStore`]; [`MemoryDocumentStore`] keeps collections in
//! process and can be shared between trackers by cloning.

use crate::config::HistoryConfig;
use crate::storage::group_by_spider;
use crate::storage::traits::{HistoryBackend, SpiderBuckets, StorageResult};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

/// Minimal document store driver interface
pub trait DocumentStore: Send {
    /// Returns the id of every document in a collection
    fn find_ids(&self, collection: &str) -> StorageResult<Vec<String>>;

    /// Inserts documents by id, leaving existing ones untouched
    fn upsert_ids(&self, collection: &str, ids: &[&str]) -> StorageResult<()>;
}

/// In-process document store
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<Mutex<HashMap<String, BTreeSet<String>>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .map_or(0, BTreeSet::len)
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn find_ids(&self, collection: &str) -> StorageResult<Vec<String>> {
        let collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(collections
            .get(collection)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn upsert_ids(&self, collection: &str, ids: &[&str]) -> StorageResult<()> {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let docs = collections.entry(collection.to_string()).or_default();
        docs.extend(ids.iter().map(|id| id.to_string()));
        Ok(())
    }
}

/// History backend over any [`DocumentStore`]
pub struct DocumentHistoryStore {
    store: Box<dyn DocumentStore>,
    success_collection: String,
    failure_collection: String,
}

impl DocumentHistoryStore {
    pub fn new(
        store: Box<dyn DocumentStore>,
        success_collection: impl Into<String>,
        failure_collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            success_collection: success_collection.into(),
            failure_collection: failure_collection.into(),
        }
    }

    /// Uses the configured base name for both collections
    pub fn from_config(store: Box<dyn DocumentStore>, config: &HistoryConfig) -> Self {
        Self::new(store, config.success_name(), config.failure_name())
    }
}

impl HistoryBackend for DocumentHistoryStore {
    fn load_success(&mut self) -> StorageResult<HashSet<String>> {
        Ok(self
            .store
            .find_ids(&self.success_collection)?
            .into_iter()
            .collect())
    }

    fn load_failure(&mut self) -> StorageResult<SpiderBuckets> {
        let ids = self.store.find_ids(&self.failure_collection)?;
        Ok(group_by_spider(ids))
    }

    fn persist_success(&mut self, keys: &HashSet<String>) -> StorageResult<usize> {
        let ids: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.store.upsert_ids(&self.success_collection, &ids)?;
        Ok(ids.len())
    }

    fn persist_failure(&mut self, buckets: &SpiderBuckets) -> StorageResult<usize> {
        let ids: Vec<&str> = buckets.values().flatten().map(String::as_str).collect();
        self.store.upsert_ids(&self.failure_collection, &ids)?;
        Ok(ids.len())
    }
}
