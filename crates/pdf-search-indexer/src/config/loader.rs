use std::path::Path;

use crate::config::schema::IndexerConfig;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/indexer-config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<IndexerConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<IndexerConfig, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: IndexerConfig = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

fn validate_config(config: &IndexerConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    let indexing = &config.indexing;
    if indexing.hard_limit_mb <= indexing.max_size_mb {
        return Err(invalid(format!(
            "indexing.hard_limit_mb ({}) must be greater than indexing.max_size_mb ({})",
            indexing.hard_limit_mb, indexing.max_size_mb
        )));
    }
    if indexing.limited_page_cap == 0 {
        return Err(invalid("indexing.limited_page_cap must be at least 1"));
    }

    let batch = &config.batch;
    if batch.base_delay_secs > batch.max_delay_secs {
        return Err(invalid(format!(
            "batch.base_delay_secs ({}) exceeds batch.max_delay_secs ({})",
            batch.base_delay_secs, batch.max_delay_secs
        )));
    }
    if batch.max_document_failures == 0 {
        return Err(invalid("batch.max_document_failures must be at least 1"));
    }
    if batch.lock_ttl_secs == 0 {
        return Err(invalid("batch.lock_ttl_secs must be at least 1"));
    }

    if config.progress.log_capacity == 0 {
        return Err(invalid("progress.log_capacity must be at least 1"));
    }

    Ok(())
}
