//! Lock repository: named, expiring mutual-exclusion rows.
//!
//! A lock row is owned by whoever wrote its token. An expired row may be
//! taken over by a new owner; a live one may not.

use rusqlite::params;

use super::{Database, DatabaseError};

/// Tries to take the named lock until `expires_at` (epoch millis).
///
/// Succeeds when the lock is free or its previous holder's expiry is at or
/// before `now`. The check and the write are a single statement.
pub fn try_acquire(
    db: &Database,
    name: &str,
    token: &str,
    now: i64,
    expires_at: i64,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "INSERT INTO locks (name, token, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET token = excluded.token, expires_at = excluded.expires_at
             WHERE locks.expires_at <= ?4",
            params![name, token, expires_at, now],
        )?;
        Ok(changed == 1)
    })
}

/// Releases the named lock if it is still held by `token`.
pub fn release(db: &Database, name: &str, token: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let removed = conn.execute(
            "DELETE FROM locks WHERE name = ?1 AND token = ?2",
            params![name, token],
        )?;
        Ok(removed > 0)
    })
}

/// Whether a live (unexpired) holder exists for the named lock.
pub fn is_held(db: &Database, name: &str, now: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM locks WHERE name = ?1 AND expires_at > ?2",
            params![name, now],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    })
}
