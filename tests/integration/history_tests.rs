//! Integration tests for crawl history
//!
//! These tests drive the tracker through whole sessions against real
//! backends in temporary directories: persist, start a new tracker, inherit.

use crawl_history::config::{parse_config, Config};
use crawl_history::request::success_key;
use crawl_history::storage::MemoryDocumentStore;
use crawl_history::{HistoryStats, HistoryTracker, Provider, Request};
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

/// Creates a configuration rooted in the given directory
fn create_test_config(dir: &TempDir) -> Config {
    let toml = format!(
        r#"
[history]
provider = "file"
cache-dir = "{cache}"
file-name = "history"

[relational]
database-path = "{db}"
"#,
        cache = dir.path().join("cache").display(),
        db = dir.path().join("history.db").display(),
    );
    parse_config(&toml).expect("test config should be valid")
}

fn request(spider: &str, path: &str) -> Request {
    Request::new(spider, format!("https://example.com{}", path))
}

#[test]
fn test_success_scenario_with_flat_file() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let u1 = request("news", "/u1");

    let tracker = HistoryTracker::new(&config).unwrap();
    tracker.read_success("file", true);
    let first = tracker.upsert_success(&u1);
    let second = tracker.upsert_success(&u1);
    assert_eq!((first, second), (true, false));

    assert_eq!(tracker.flush_success("file"), 1);
    let raw = fs::read_to_string(config.history.success_file()).unwrap();
    assert_eq!(raw, format!(",\"{}\":true", success_key(&u1)));

    // Already persisted records stay known after the flush
    assert!(!tracker.upsert_success(&u1));
    assert_eq!(tracker.flush_success("file"), 0);

    let reloaded = HistoryTracker::new(&config).unwrap();
    reloaded.read_success("file", true);
    assert_eq!(reloaded.stats().successes, 1);
    assert!(reloaded.has_succeeded(&u1));
    assert!(!reloaded.upsert_success(&u1));
}

#[test]
fn test_failure_scenario_with_flat_file() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let k1 = request("news", "/k1").with_rule("article");

    let tracker = HistoryTracker::new(&config).unwrap();
    tracker.read_failure("file", true);
    assert!(tracker.upsert_failure(&k1));

    // Pending failures of the current session are not handed out for retry
    assert!(tracker.pull_failure("news").is_empty());
    assert_eq!(tracker.flush_failure("file"), 1);

    let next_run = HistoryTracker::new(&config).unwrap();
    next_run.read_failure("file", true);
    assert_eq!(next_run.pull_failure("news"), vec![k1]);
}

#[test]
fn test_flat_file_accumulates_across_sessions() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    for (session, path) in ["/a", "/b", "/c"].iter().enumerate() {
        let tracker = HistoryTracker::new(&config).unwrap();
        tracker.read_success("file", true);
        tracker.read_failure("file", true);
        assert_eq!(tracker.stats().successes, session);

        tracker.upsert_success(&request("news", path));
        tracker.upsert_failure(&request("news", &format!("{}/broken", path)));
        tracker.flush_success("file");
        tracker.flush_failure("file");
    }

    let tracker = HistoryTracker::new(&config).unwrap();
    tracker.read_success("file", true);
    tracker.read_failure("file", true);

    let stats = tracker.stats();
    assert_eq!(stats.successes, 3);
    assert_eq!(stats.failures["news"], 3);
    assert_eq!(tracker.pull_failure("news").len(), 3);
}

#[test]
fn test_pull_failure_is_scoped_to_spider() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    let writer = HistoryTracker::new(&config).unwrap();
    writer.upsert_failure(&request("x", "/1"));
    writer.upsert_failure(&request("x", "/2"));
    writer.upsert_failure(&request("y", "/3"));
    writer.flush_failure("file");

    let tracker = HistoryTracker::new(&config).unwrap();
    tracker.read_failure("file", true);

    let urls: HashSet<String> = tracker
        .pull_failure("x")
        .into_iter()
        .map(|r| r.url)
        .collect();
    let expected: HashSet<String> = ["https://example.com/1", "https://example.com/2"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(urls, expected);
    assert!(tracker.pull_failure("z").is_empty());
}

#[test]
fn test_read_without_inherit_ignores_backend() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    let writer = HistoryTracker::new(&config).unwrap();
    writer.upsert_success(&request("news", "/old"));
    writer.upsert_failure(&request("news", "/old-broken"));
    writer.flush_success("file");
    writer.flush_failure("file");

    let tracker = HistoryTracker::new(&config).unwrap();
    tracker.read_success("file", false);
    tracker.read_failure("file", false);

    assert_eq!(tracker.stats(), HistoryStats::default());
    assert!(tracker.upsert_success(&request("news", "/old")));
    assert!(tracker.pull_failure("news").is_empty());
}

#[test]
fn test_repeated_inheriting_read_is_noop() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    let writer = HistoryTracker::new(&config).unwrap();
    writer.upsert_success(&request("news", "/a"));
    writer.flush_success("file");

    let tracker = HistoryTracker::new(&config).unwrap();
    tracker.read_success("file", true);
    tracker.upsert_success(&request("news", "/b"));

    // A concurrent session appends to the same file in between
    writer.upsert_success(&request("news", "/c"));
    writer.flush_success("file");

    tracker.read_success("file", true);
    let stats = tracker.stats();
    assert_eq!(stats.successes, 1);
    assert_eq!(stats.pending_successes, 1);
    assert!(!tracker.has_succeeded(&request("news", "/c")));
}

#[test]
fn test_empty_then_inherit_reloads() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    let tracker = HistoryTracker::new(&config).unwrap();
    tracker.read_success("file", true);
    tracker.read_failure("file", true);
    tracker.upsert_success(&request("news", "/a"));
    tracker.upsert_failure(&request("news", "/broken"));
    tracker.flush_success("file");
    tracker.flush_failure("file");
    tracker.upsert_success(&request("news", "/unflushed"));

    tracker.empty();
    assert_eq!(tracker.stats(), HistoryStats::default());

    tracker.read_success("file", true);
    tracker.read_failure("file", true);

    let fresh = HistoryTracker::new(&config).unwrap();
    fresh.read_success("file", true);
    fresh.read_failure("file", true);

    assert_eq!(tracker.stats(), fresh.stats());
    assert_eq!(tracker.stats().successes, 1);
    assert_eq!(tracker.pull_failure("news"), fresh.pull_failure("news"));
}

#[test]
fn test_relational_backend_roundtrip() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let failed = request("news", "/broken");

    {
        let tracker = HistoryTracker::new(&config).unwrap();
        tracker.read_success(Provider::Relational, true);
        tracker.read_failure(Provider::Relational, true);
        tracker.upsert_success(&request("news", "/ok"));
        tracker.upsert_failure(&failed);
        assert_eq!(tracker.flush_success("mysql"), 1);
        assert_eq!(tracker.flush_failure("mysql"), 1);
    }

    let tracker = HistoryTracker::new(&config).unwrap();
    tracker.read_success("mysql", true);
    tracker.read_failure("mysql", true);

    assert!(tracker.has_succeeded(&request("news", "/ok")));
    assert_eq!(tracker.pull_failure("news"), vec![failed]);

    // Nothing went to the flat files
    assert!(!config.history.success_file().exists());
    assert!(!config.history.failure_file().exists());
}

#[test]
fn test_document_backend_shared_between_trackers() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let store = MemoryDocumentStore::new();
    let failed = request("blogs", "/broken");

    let first = HistoryTracker::with_document_store(&config, Box::new(store.clone())).unwrap();
    first.upsert_success(&request("blogs", "/ok"));
    first.upsert_failure(&failed);
    first.flush_success("mgo");
    first.flush_failure("mgo");
    assert_eq!(store.count("history_y"), 1);
    assert_eq!(store.count("history_n"), 1);

    let second = HistoryTracker::with_document_store(&config, Box::new(store)).unwrap();
    second.read_success("mgo", true);
    second.read_failure("mgo", true);

    assert!(second.has_succeeded(&request("blogs", "/ok")));
    assert_eq!(second.pull_failure("blogs"), vec![failed]);
}

#[test]
fn test_concurrent_upserts_record_each_key_once() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let tracker = Arc::new(HistoryTracker::new(&config).unwrap());
    tracker.read_success("file", true);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || {
                (0..50)
                    .filter(|i| tracker.upsert_success(&request("news", &format!("/{}", i))))
                    .count()
            })
        })
        .collect();

    let recorded: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(recorded, 50);
    assert_eq!(tracker.flush_success("file"), 50);

    let reloaded = HistoryTracker::new(&config).unwrap();
    reloaded.read_success("file", true);
    assert_eq!(reloaded.stats().successes, 50);
}
