//! Configuration module for crawl-history
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use crawl_history::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("history.toml")).unwrap();
//! println!("History provider: {}", config.history.provider);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, HistoryConfig, Provider, RelationalConfig, FAILURE_SUFFIX, SUCCESS_SUFFIX,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
