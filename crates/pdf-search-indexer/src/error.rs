//! Error types for each layer, folded into [`IndexerError`] at the crate boundary.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("extraction: {0}")]
    Extract(#[from] ExtractError),

    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("storage: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config is not valid JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("invalid config: {message}")]
    Validation { message: String },

    #[error("config does not match schema: {errors}")]
    SchemaValidation { errors: String },
}

/// Failures of a single extraction attempt. `Secured` is terminal; the rest
/// count toward the per-document failure limit.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("cannot read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document is encrypted or password-protected")]
    Secured,

    #[error("unreadable PDF: {0}")]
    Parse(String),

    #[error("extraction did not finish within {secs}s")]
    Timeout { secs: u64 },
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("no document with id {0}")]
    NotFound(i64),

    #[error("cannot scan '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

pub type Result<T> = std::result::Result<T, IndexerError>;
