//! History tracker facade
//!
//! One tracker lives for the whole crawl engine. Every public method takes
//! the single state lock and holds it until it returns, backend I/O
//! included, so no caller ever observes a half-applied read or flush.

use crate::config::{Config, Provider};
use crate::history::{FailureStore, HistoryStats, SuccessStore};
use crate::request::{failure_key, spider_name_of, success_key, Record, Request};
use crate::storage::{Backends, DocumentHistoryStore, DocumentStore};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

struct TrackerState {
    success: SuccessStore,
    failure: FailureStore,
    provider: Option<Provider>,
    backends: Backends,
}

/// Success and failure history shared by all request-completion callers
pub struct HistoryTracker {
    state: Mutex<TrackerState>,
}

impl HistoryTracker {
    /// Creates a tracker with the backends described by the configuration
    pub fn new(config: &Config) -> crate::Result<Self> {
        Ok(Self::with_backends(Backends::from_config(config)?))
    }

    /// Creates a tracker that can also persist to a document store
    pub fn with_document_store(
        config: &Config,
        store: Box<dyn DocumentStore>,
    ) -> crate::Result<Self> {
        let backends = Backends::from_config(config)?
            .with_document(DocumentHistoryStore::from_config(store, &config.history));
        Ok(Self::with_backends(backends))
    }

    pub fn with_backends(backends: Backends) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                success: SuccessStore::new(),
                failure: FailureStore::new(),
                provider: None,
                backends,
            }),
        }
    }

    // The stores are consistent between statements, so a panic in another
    // caller never leaves them torn.
    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Session Lifecycle =====

    /// Starts the success history for a session
    ///
    /// With `inherit` the persisted successes of `provider` become the
    /// baseline; without it the session starts with no memory of past runs.
    pub fn read_success(&self, provider: impl Into<Provider>, inherit: bool) {
        let provider = provider.into();
        let mut guard = self.lock();
        let state = &mut *guard;
        state.provider = Some(provider);

        debug!("Reading success history from {} (inherit: {})", provider, inherit);
        state
            .success
            .read_inherit(inherit, || state.backends.select(provider)?.load_success());
    }

    /// Starts the failure history for a session
    pub fn read_failure(&self, provider: impl Into<Provider>, inherit: bool) {
        let provider = provider.into();
        let mut guard = self.lock();
        let state = &mut *guard;
        state.provider = Some(provider);

        debug!("Reading failure history from {} (inherit: {})", provider, inherit);
        state
            .failure
            .read_inherit(inherit, || state.backends.select(provider)?.load_failure());
    }

    /// Writes pending successes to `provider` and keeps them in memory
    ///
    /// # Returns
    ///
    /// The number of records handed to the backend
    pub fn flush_success(&self, provider: impl Into<Provider>) -> usize {
        let provider = provider.into();
        let mut guard = self.lock();
        let state = &mut *guard;
        state.provider = Some(provider);

        let count = state
            .success
            .flush(|keys| state.backends.select(provider)?.persist_success(keys));
        log_flush("success", count, state.success.pending(), provider);
        count
    }

    /// Writes pending failures to `provider` and keeps them in memory
    pub fn flush_failure(&self, provider: impl Into<Provider>) -> usize {
        let provider = provider.into();
        let mut guard = self.lock();
        let state = &mut *guard;
        state.provider = Some(provider);

        let count = state
            .failure
            .flush(|buckets| state.backends.select(provider)?.persist_failure(buckets));
        log_flush("failure", count, state.failure.pending(), provider);
        count
    }

    /// Drops all in-memory history without writing anything
    ///
    /// The next inheriting read reloads from the backend, as on a new tracker.
    pub fn empty(&self) {
        let mut state = self.lock();
        state.success.clear();
        state.failure.clear();
        debug!("Emptied crawl history");
    }

    // ===== Success Records =====

    /// Records a successful fetch, returning false if it was already known
    pub fn upsert_success<R: Record + ?Sized>(&self, record: &R) -> bool {
        let key = success_key(record);
        self.lock().success.upsert(key)
    }

    /// Forgets a success so the request is fetched again
    pub fn delete_success<R: Record + ?Sized>(&self, record: &R) {
        let key = success_key(record);
        self.lock().success.delete(&key);
    }

    /// Returns true if the record already succeeded in this or an inherited run
    pub fn has_succeeded<R: Record + ?Sized>(&self, record: &R) -> bool {
        let key = success_key(record);
        self.lock().success.contains(&key)
    }

    // ===== Failure Records =====

    /// Records a failed request, returning false if it was already known
    pub fn upsert_failure(&self, request: &Request) -> bool {
        let key = match failure_key(request) {
            Ok(key) => key,
            Err(e) => {
                warn!("Cannot record failure for {}: {}", request.url, e);
                return false;
            }
        };
        self.lock().failure.upsert(spider_name_of(request), key)
    }

    /// Forgets a failure, typically once the request has succeeded
    pub fn delete_failure(&self, request: &Request) {
        match failure_key(request) {
            Ok(key) => self.lock().failure.delete(spider_name_of(request), &key),
            Err(e) => warn!("Cannot delete failure for {}: {}", request.url, e),
        }
    }

    /// Requests that failed for `spider` in the previous run
    pub fn pull_failure(&self, spider: &str) -> Vec<Request> {
        self.lock().failure.pull(spider)
    }

    // ===== Inspection =====

    /// The provider named by the most recent read or flush
    pub fn provider(&self) -> Option<Provider> {
        self.lock().provider
    }

    /// Snapshot of record counts
    pub fn stats(&self) -> HistoryStats {
        let state = self.lock();
        HistoryStats {
            successes: state.success.persisted(),
            pending_successes: state.success.pending(),
            failures: state.failure.persisted_by_spider(),
            pending_failures: state.failure.pending(),
        }
    }
}

/// A flush either clears the delta or leaves all of it pending
fn log_flush(ledger: &str, attempted: usize, pending: usize, provider: Provider) {
    if pending == 0 {
        info!("Newly persisted {} {} records to {}", attempted, ledger, provider);
    } else {
        warn!(
            "{} {} records not persisted to {}, {} still pending",
            attempted, ledger, provider, pending
        );
    }
}
