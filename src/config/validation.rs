use crate::config::types::{Config, HistoryConfig, Provider, RelationalConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_history_config(&config.history)?;

    if let Some(relational) = &config.relational {
        validate_relational_config(relational)?;
    } else if config.history.provider == Provider::Relational {
        return Err(ConfigError::Validation(
            "provider 'mysql' requires a [relational] section".to_string(),
        ));
    }

    Ok(())
}

/// Validates history location settings
fn validate_history_config(config: &HistoryConfig) -> Result<(), ConfigError> {
    if config.cache_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "cache_dir cannot be empty".to_string(),
        ));
    }

    validate_file_name(&config.file_name)
}

/// Validates relational store settings
fn validate_relational_config(config: &RelationalConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// The base name doubles as a table name, so it is kept to a safe alphabet
fn validate_file_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "file_name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "file_name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            name
        )));
    }

    Ok(())
}
