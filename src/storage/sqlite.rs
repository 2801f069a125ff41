//! SQLite storage implementation
//!
//! This module provides the relational history backend. Each ledger is one
//! table of record keys; writes use `INSERT OR IGNORE` so a retried flush is
//! harmless.

use crate::config::HistoryConfig;
use crate::storage::group_by_spider;
use crate::storage::schema::{initialize_schema, quote_identifier};
use crate::storage::traits::{HistoryBackend, SpiderBuckets, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;

/// SQLite history backend
pub struct SqliteHistoryStore {
    conn: Connection,
    success_table: String,
    failure_table: String,
}

impl SqliteHistoryStore {
    /// Opens (or creates) the history database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `success_table` - Table holding success keys
    /// * `failure_table` - Table holding failure keys
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteHistoryStore)` - Successfully opened/created database
    /// * `Err(rusqlite::Error)` - Failed to open database
    pub fn open(
        path: &Path,
        success_table: impl Into<String>,
        failure_table: impl Into<String>,
    ) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        Self::with_connection(conn, success_table.into(), failure_table.into())
    }

    /// Opens the database named by the configuration
    pub fn from_config(
        database_path: &Path,
        config: &HistoryConfig,
    ) -> Result<Self, rusqlite::Error> {
        Self::open(database_path, config.success_name(), config.failure_name())
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, "history_y".to_string(), "history_n".to_string())
    }

    fn with_connection(
        conn: Connection,
        success_table: String,
        failure_table: String,
    ) -> Result<Self, rusqlite::Error> {
        initialize_schema(&conn, &[success_table.as_str(), failure_table.as_str()])?;
        Ok(Self {
            conn,
            success_table,
            failure_table,
        })
    }

    fn select_ids(&self, table: &str) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id FROM {}", quote_identifier(table)))?;

        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(ids)
    }

    fn insert_ids<'a, I>(&mut self, table: &str, ids: I) -> StorageResult<usize>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR IGNORE INTO {} (id, recorded_at) VALUES (?1, ?2)",
                quote_identifier(table)
            ))?;
            for id in ids {
                stmt.execute(params![id, now])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }
}

impl HistoryBackend for SqliteHistoryStore {
    fn load_success(&mut self) -> StorageResult<HashSet<String>> {
        Ok(self.select_ids(&self.success_table)?.into_iter().collect())
    }

    fn load_failure(&mut self) -> StorageResult<SpiderBuckets> {
        let ids = self.select_ids(&self.failure_table)?;
        Ok(group_by_spider(ids))
    }

    fn persist_success(&mut self, keys: &HashSet<String>) -> StorageResult<usize> {
        let table = self.success_table.clone();
        self.insert_ids(&table, keys)
    }

    fn persist_failure(&mut self, buckets: &SpiderBuckets) -> StorageResult<usize> {
        let table = self.failure_table.clone();
        self.insert_ids(&table, buckets.values().flatten())
    }
}
