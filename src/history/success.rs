//! Success history
//!
//! Keys of requests that completed successfully, split into the baseline
//! inherited from earlier sessions and the delta recorded in this one.

use crate::storage::StorageResult;
use std::collections::HashSet;
use tracing::{info, warn};

/// Baseline/delta set of success keys
#[derive(Debug, Default)]
pub struct SuccessStore {
    baseline: HashSet<String>,
    delta: HashSet<String>,
    inheritable: bool,
}

impl SuccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session, optionally inheriting persisted successes
    ///
    /// Without inheritance the store is emptied and the backend is not
    /// consulted. With inheritance the baseline is loaded once; further
    /// inheriting reads are no-ops until the store is reset. A failed load
    /// leaves an empty baseline and still counts as the session's inherit,
    /// so records upserted afterwards survive later inheriting reads.
    ///
    /// # Returns
    ///
    /// The number of keys loaded by this call
    pub fn read_inherit<F>(&mut self, inherit: bool, load: F) -> usize
    where
        F: FnOnce() -> StorageResult<HashSet<String>>,
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
            Ok(keys) => {
                self.baseline = keys;
                info!("Read {} success records", self.baseline.len());
                self.baseline.len()
            }
            Err(e) => {
                warn!("Failed to read success records, starting empty: {}", e);
                0
            }
        }
    }

    /// Returns true if the key already succeeded
    pub fn contains(&self, key: &str) -> bool {
        self.baseline.contains(key) || self.delta.contains(key)
    }

    /// Records a success, returning false if the key was already known
    pub fn upsert(&mut self, key: String) -> bool {
        if self.contains(&key) {
            return false;
        }
        self.delta.insert(key)
    }

    pub fn delete(&mut self, key: &str) {
        self.baseline.remove(key);
        self.delta.remove(key);
    }

    /// Persists pending keys and folds them into the baseline
    ///
    /// On a backend error the delta stays pending for the next flush.
    ///
    /// # Returns
    ///
    /// The number of keys handed to the backend
    pub fn flush<F>(&mut self, persist: F) -> usize
    where
        F: FnOnce(&HashSet<String>) -> StorageResult<usize>,
    {
        if self.delta.is_empty() {
            return 0;
        }

        let attempted = self.delta.len();
        match persist(&self.delta) {
            Ok(_) => {
                let delta = std::mem::take(&mut self.delta);
                self.baseline.extend(delta);
            }
            Err(e) => {
                warn!(
                    "Failed to persist {} success records, keeping them pending: {}",
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

    /// Number of keys already persisted
    pub fn persisted(&self) -> usize {
        self.baseline.len()
    }

    /// Number of keys waiting for a flush
    pub fn pending(&self) -> usize {
        self.delta.len()
    }
}
