//! Flat file history backend
//!
//! Each ledger is a single file that only ever grows. A flush appends one
//! fragment per entry without touching what is already there:
//!
//! ```text
//! success:  ,"<key>":true,"<key>":true
//! failure:  ,"<spider>":{"<key>":true,"<key>":true},"<spider>":{"<key>":true}
//! ```
//!
//! The file is not valid JSON on its own. At load time the leading comma is
//! swapped for `{`, a trailing comma (if any) is dropped and `}` is appended,
//! which turns the content into one JSON object.

use crate::config::HistoryConfig;
use crate::storage::traits::{HistoryBackend, SpiderBuckets, StorageResult};
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Append-only flat file backend
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    success_path: PathBuf,
    failure_path: PathBuf,
}

impl FileHistoryStore {
    pub fn new(success_path: impl Into<PathBuf>, failure_path: impl Into<PathBuf>) -> Self {
        Self {
            success_path: success_path.into(),
            failure_path: failure_path.into(),
        }
    }

    /// Builds the store from the configured cache directory and base name
    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.success_file(), config.failure_file())
    }

    pub fn success_path(&self) -> &Path {
        &self.success_path
    }

    pub fn failure_path(&self) -> &Path {
        &self.failure_path
    }
}

impl HistoryBackend for FileHistoryStore {
    fn load_success(&mut self) -> StorageResult<HashSet<String>> {
        let Some(document) = read_document(&self.success_path)? else {
            return Ok(HashSet::new());
        };

        let entries: HashMap<String, bool> = serde_json::from_slice(&document)?;
        Ok(entries
            .into_iter()
            .filter_map(|(key, done)| done.then_some(key))
            .collect())
    }

    fn load_failure(&mut self) -> StorageResult<SpiderBuckets> {
        let Some(document) = read_document(&self.failure_path)? else {
            return Ok(SpiderBuckets::new());
        };

        let merged: MergedBuckets = serde_json::from_slice(&document)?;
        Ok(merged.0)
    }

    fn persist_success(&mut self, keys: &HashSet<String>) -> StorageResult<usize> {
        let fragment = success_fragment(keys)?;
        append(&self.success_path, &fragment)?;
        Ok(keys.len())
    }

    fn persist_failure(&mut self, buckets: &SpiderBuckets) -> StorageResult<usize> {
        let fragment = failure_fragment(buckets)?;
        append(&self.failure_path, &fragment)?;
        Ok(buckets.values().map(HashSet::len).sum())
    }
}

/// Reads a ledger file and repairs it into a JSON object
///
/// Returns `None` when the file does not exist.
fn read_document(path: &Path) -> StorageResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(raw) => Ok(Some(repair(&raw))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("History file {} not found, starting empty", path.display());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Wraps appended fragments into a single JSON object
fn repair(raw: &[u8]) -> Vec<u8> {
    let mut body = trim_ascii_whitespace(raw);
    if let [b',', rest @ ..] = body {
        body = rest;
    }
    if let [rest @ .., b','] = body {
        body = rest;
    }

    let mut document = Vec::with_capacity(body.len() + 2);
    document.push(b'{');
    document.extend_from_slice(body);
    document.push(b'}');
    document
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

fn success_fragment(keys: &HashSet<String>) -> StorageResult<String> {
    let mut sorted: Vec<&String> = keys.iter().collect();
    sorted.sort();

    let mut fragment = String::new();
    for key in sorted {
        fragment.push(',');
        fragment.push_str(&serde_json::to_string(key)?);
        fragment.push_str(":true");
    }
    Ok(fragment)
}

fn failure_fragment(buckets: &SpiderBuckets) -> StorageResult<String> {
    let mut spiders: Vec<(&String, &HashSet<String>)> = buckets
        .iter()
        .filter(|(_, keys)| !keys.is_empty())
        .collect();
    spiders.sort_by(|a, b| a.0.cmp(b.0));

    let mut fragment = String::new();
    for (spider, keys) in spiders {
        let mut sorted: Vec<&String> = keys.iter().collect();
        sorted.sort();

        fragment.push(',');
        fragment.push_str(&serde_json::to_string(spider)?);
        fragment.push_str(":{");
        for (i, key) in sorted.into_iter().enumerate() {
            if i > 0 {
                fragment.push(',');
            }
            fragment.push_str(&serde_json::to_string(key)?);
            fragment.push_str(":true");
        }
        fragment.push('}');
    }
    Ok(fragment)
}

fn append(path: &Path, fragment: &str) -> io::Result<()> {
    if fragment.is_empty() {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            fs::create_dir_all(parent)?;
            debug!("Created history directory {}", parent.display());
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(fragment.as_bytes())?;
    file.flush()
}

/// Failure ledger contents with repeated spider entries merged
///
/// Every flush appends a new `"<spider>":{...}` entry, so the same spider
/// shows up many times in one file. A plain map would keep only the last one.
struct MergedBuckets(SpiderBuckets);

impl<'de> Deserialize<'de> for MergedBuckets {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BucketsVisitor;

        impl<'de> Visitor<'de> for BucketsVisitor {
            type Value = MergedBuckets;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of spider names to failure keys")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut buckets = SpiderBuckets::new();
                while let Some((spider, keys)) =
                    access.next_entry::<String, HashMap<String, bool>>()?
                {
                    let bucket = buckets.entry(spider).or_default();
                    for (key, failed) in keys {
                        if failed {
                            bucket.insert(key);
                        } else {
                            bucket.remove(&key);
                        }
                    }
                }
                Ok(MergedBuckets(buckets))
            }
        }

        deserializer.deserialize_map(BucketsVisitor)
    }
}
