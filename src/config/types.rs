use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Suffix appended to the base file name for the success history
pub const SUCCESS_SUFFIX: &str = "_y";

/// Suffix appended to the base file name for the failure history
pub const FAILURE_SUFFIX: &str = "_n";

/// Main configuration structure for crawl-history
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub history: HistoryConfig,
    #[serde(default)]
    pub relational: Option<RelationalConfig>,
}

/// Where and how history is persisted
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Backend used when no provider is passed explicitly
    #[serde(default)]
    pub provider: Provider,

    /// Directory holding the flat history files
    #[serde(rename = "cache-dir")]
    pub cache_dir: PathBuf,

    /// Base name for history files, tables and collections
    #[serde(rename = "file-name")]
    pub file_name: String,
}

impl HistoryConfig {
    /// Name of the success file, table or collection
    pub fn success_name(&self) -> String {
        format!("{}{}", self.file_name, SUCCESS_SUFFIX)
    }

    /// Name of the failure file, table or collection
    pub fn failure_name(&self) -> String {
        format!("{}{}", self.file_name, FAILURE_SUFFIX)
    }

    /// Full path of the flat success file
    pub fn success_file(&self) -> PathBuf {
        self.cache_dir.join(self.success_name())
    }

    /// Full path of the flat failure file
    pub fn failure_file(&self) -> PathBuf {
        self.cache_dir.join(self.failure_name())
    }
}

/// Relational store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelationalConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Persistence backend selector
///
/// Provider names come from the crawl engine at runtime. `"mgo"` selects the
/// document store, `"mysql"` the relational store, and every other name the
/// flat file backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum Provider {
    Document,
    Relational,
    #[default]
    File,
}

impl Provider {
    /// Resolves a provider name, falling back to the flat file backend
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "mgo" => Self::Document,
            "mysql" => Self::Relational,
            _ => Self::File,
        }
    }

    /// The canonical provider name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Document => "mgo",
            Self::Relational => "mysql",
            Self::File => "file",
        }
    }
}

impl From<String> for Provider {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<&str> for Provider {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
