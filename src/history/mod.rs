//! Crawl history module
//!
//! This module tracks which requests succeeded and which failed, across one
//! or many crawl sessions.
//!
//! # Components
//!
//! - `SuccessStore`: success keys, inherited baseline plus pending delta
//! - `FailureStore`: failure keys, the same split per spider
//! - `HistoryTracker`: the locked facade the crawl engine talks to

mod failure;
mod success;
mod tracker;

// Re-export main types
pub use failure::FailureStore;
pub use success::SuccessStore;
pub use tracker::HistoryTracker;

use std::collections::BTreeMap;

/// Record counts at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStats {
    /// Successes already persisted or inherited
    pub successes: usize,

    /// Successes waiting for a flush
    pub pending_successes: usize,

    /// Persisted or inherited failures per spider
    pub failures: BTreeMap<String, usize>,

    /// Failures waiting for a flush, across all spiders
    pub pending_failures: usize,
}

impl HistoryStats {
    /// Persisted failures across all spiders
    pub fn total_failures(&self) -> usize {
        self.failures.values().sum()
    }
}
