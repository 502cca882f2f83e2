//! Failures surfaced by the persistence layer.

use std::path::PathBuf;
use thiserror::Error;

/// Raised by [`super::Database`] and the repositories built on it.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database directory could not be created.
    #[error("cannot prepare database directory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema migration {version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// An option record (progress, lock owner, ...) held malformed JSON.
    #[error("option record '{key}' is not valid JSON: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A thread panicked while holding the connection.
    #[error("database connection mutex poisoned")]
    LockPoisoned,
}
