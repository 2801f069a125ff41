//! Failure history
//!
//! Keys of failed requests, grouped by the spider that issued them. The
//! baseline holds failures inherited from the previous run and is what
//! [`FailureStore::pull`] hands back for retry; the delta holds failures of
//! the current session.

use crate::request::{decode_request, Request};
use crate::storage::{SpiderBuckets, StorageResult};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Per-spider baseline/delta sets of failure keys
#[derive(Debug, Default)]
pub struct FailureStore {
    baseline: SpiderBuckets,
    delta: SpiderBuckets,
    inheritable: bool,
}

impl FailureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session, optionally inheriting persisted failures
    ///
    /// Same rules as the success history: no inheritance empties the store,
    /// a repeated inheriting read is a no-op even after a failed load, which
    /// leaves the baseline empty.
    ///
    /// # Returns
    ///
    /// The number of keys loaded by this call, across all spiders
    pub fn read_inherit<F>(&mut self, inherit: bool, load: F) -> usize
    where
        F: FnOnce() -> StorageResult<SpiderBuckets>,
    {
        if !inherit {
            self.clear();
            return 0;
        }

        if self.inheritable {
            return 0;
        }

        self.baseline.clear();
        self.delta.clear();
        self.inheritable = true;

        match load() {
            Ok(buckets) => {
                self.baseline = buckets;
                let count = self.persisted();
                info!(
                    "Read {} failure records across {} spiders",
                    count,
                    self.baseline.len()
                );
                count
            }
            Err(e) => {
                warn!("Failed to read failure records, starting empty: {}", e);
                0
            }
        }
    }

    /// Returns true if the key already failed for this spider
    pub fn contains(&self, spider: &str, key: &str) -> bool {
        let in_bucket =
            |buckets: &SpiderBuckets| buckets.get(spider).is_some_and(|keys| keys.contains(key));
        in_bucket(&self.baseline) || in_bucket(&self.delta)
    }

    /// Records a failure, returning false if it was already known
    pub fn upsert(&mut self, spider: &str, key: String) -> bool {
        if self.contains(spider, &key) {
            return false;
        }
        self.baseline.entry(spider.to_string()).or_default();
        self.delta.entry(spider.to_string()).or_default().insert(key)
    }

    pub fn delete(&mut self, spider: &str, key: &str) {
        if let Some(keys) = self.baseline.get_mut(spider) {
            keys.remove(key);
        }
        if let Some(keys) = self.delta.get_mut(spider) {
            keys.remove(key);
        }
    }

    /// Requests that failed for a spider in the previous run
    ///
    /// Only the baseline is consulted. Keys that no longer decode are skipped.
    pub fn pull(&self, spider: &str) -> Vec<Request> {
        let Some(keys) = self.baseline.get(spider) else {
            return Vec::new();
        };

        let requests: Vec<Request> = keys
            .iter()
            .filter_map(|key| decode_request(key).ok())
            .collect();

        if requests.len() < keys.len() {
            debug!(
                "Skipped {} undecodable failure records for spider {}",
                keys.len() - requests.len(),
                spider
            );
        }

        requests
    }

    /// Persists pending keys for every spider and folds them into the baseline
    ///
    /// On a backend error the delta stays pending for the next flush.
    ///
    /// # Returns
    ///
    /// The number of keys handed to the backend
    pub fn flush<F>(&mut self, persist: F) -> usize
    where
        F: FnOnce(&SpiderBuckets) -> StorageResult<usize>,
    {
        let attempted = self.pending();
        if attempted == 0 {
            return 0;
        }

        match persist(&self.delta) {
            Ok(_) => {
                for (spider, keys) in std::mem::take(&mut self.delta) {
                    self.baseline.entry(spider).or_default().extend(keys);
                }
            }
            Err(e) => {
                warn!(
                    "Failed to persist {} failure records, keeping them pending: {}",
                    attempted, e
                );
            }
        }
        attempted
    }

    /// Forgets everything, including whether the session inherited
    pub fn clear(&mut self) {
        self.baseline.clear();
        self.delta.clear();
        self.inheritable = false;
    }

    pub fn is_inheritable(&self) -> bool {
        self.inheritable
    }

    /// Number of persisted keys, across all spiders
    pub fn persisted(&self) -> usize {
        self.baseline.values().map(HashSet::len).sum()
    }

    /// Number of keys waiting for a flush, across all spiders
    pub fn pending(&self) -> usize {
        self.delta.values().map(HashSet::len).sum()
    }

    /// Persisted key count for every spider with persisted failures
    pub fn persisted_by_spider(&self) -> BTreeMap<String, usize> {
        self.baseline
            .iter()
            .filter(|(_, keys)| !keys.is_empty())
            .map(|(spider, keys)| (spider.clone(), keys.len()))
            .collect()
    }
}
