//! Option repository: named JSON records in the `options` table.

use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Database, DatabaseError};

/// Loads and decodes a named record.
pub fn get<T: DeserializeOwned>(db: &Database, name: &str) -> Result<Option<T>, DatabaseError> {
    let raw: Option<String> = db.with_conn(|conn| {
        let value = conn
            .query_row(
                "SELECT value FROM options WHERE name = ?1",
                params![name],
                |r| r.get(0),
            )
            .optional()?;
        Ok(value)
    })?;

    raw.map(|json| {
        serde_json::from_str(&json).map_err(|source| DatabaseError::Serialize {
            key: name.to_string(),
            source,
        })
    })
    .transpose()
}

/// Encodes and stores a named record, replacing any previous value.
pub fn set<T: Serialize>(
    db: &Database,
    name: &str,
    value: &T,
    updated_at: &str,
) -> Result<(), DatabaseError> {
    let json = serde_json::to_string(value).map_err(|source| DatabaseError::Serialize {
        key: name.to_string(),
        source,
    })?;

    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO options (name, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![name, json, updated_at],
        )?;
        Ok(())
    })
}

/// Deletes a named record. Returns whether it existed.
pub fn delete(db: &Database, name: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let removed = conn.execute("DELETE FROM options WHERE name = ?1", params![name])?;
        Ok(removed > 0)
    })
}
