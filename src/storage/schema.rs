//! Database schema definitions
//!
//! Each history ledger is one table keyed by the record key. Table names are
//! derived from the configured base name, so the DDL is built per table.

/// Builds the DDL for one history table
pub fn table_sql(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    id TEXT PRIMARY KEY,
    recorded_at TEXT NOT NULL
);
"#,
        table = quote_identifier(table)
    )
}

/// Quotes a table name for use in SQL
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Initializes the success and failure tables
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `tables` - Names of the tables to create
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(
    conn: &rusqlite::Connection,
    tables: &[&str],
) -> Result<(), rusqlite::Error> {
    for table in tables {
        conn.execute_batch(&table_sql(table))?;
    }
    Ok(())
}
