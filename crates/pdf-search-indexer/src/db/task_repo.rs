//! Scheduled task repository: the persisted delayed task queue.

use rusqlite::params;

use super::{Database, DatabaseError};

/// Adds one pending invocation of `hook` at `run_at` (epoch millis).
pub fn insert(db: &Database, hook: &str, run_at: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO scheduled_tasks (hook, run_at) VALUES (?1, ?2)",
            params![hook, run_at],
        )?;
        Ok(())
    })
}

/// Earliest pending run time of `hook`, if any.
pub fn next_run_at(db: &Database, hook: &str) -> Result<Option<i64>, DatabaseError> {
    db.with_conn(|conn| {
        let run_at: Option<i64> = conn.query_row(
            "SELECT MIN(run_at) FROM scheduled_tasks WHERE hook = ?1",
            params![hook],
            |r| r.get(0),
        )?;
        Ok(run_at)
    })
}

/// Removes every pending invocation of `hook`.
pub fn delete_hook(db: &Database, hook: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn.execute(
            "DELETE FROM scheduled_tasks WHERE hook = ?1",
            params![hook],
        )?)
    })
}

/// Removes and returns all invocations due at or before `now`, oldest first.
pub fn take_due(db: &Database, now: i64) -> Result<Vec<(String, i64)>, DatabaseError> {
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        let due = {
            let mut stmt = tx.prepare(
                "SELECT hook, run_at FROM scheduled_tasks WHERE run_at <= ?1 ORDER BY run_at ASC, id ASC",
            )?;
            let rows = stmt
                .query_map(params![now], |r| Ok((r.get(0)?, r.get(1)?)))?
                .collect::<Result<Vec<(String, i64)>, _>>()?;
            rows
        };
        tx.execute(
            "DELETE FROM scheduled_tasks WHERE run_at <= ?1",
            params![now],
        )?;
        tx.commit()?;
        Ok(due)
    })
}
