//! Delayed task queue the host drains.
//!
//! Pending invocations are persisted so a batch scheduled by one process
//! can be delivered by another.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::clock::Clock;
use crate::db::{task_repo, Database, DatabaseError};

/// Hook name of the batch runner.
pub const INDEX_BATCH_TASK: &str = "index_pdf_batch";

pub trait TaskQueue: Send + Sync {
    /// Queues one invocation of `hook` after `delay`.
    fn schedule(&self, hook: &str, delay: Duration) -> Result<(), DatabaseError>;

    /// Earliest pending invocation of `hook`.
    fn next_scheduled(&self, hook: &str) -> Result<Option<DateTime<Utc>>, DatabaseError>;

    /// Drops every pending invocation of `hook`.
    fn clear(&self, hook: &str) -> Result<usize, DatabaseError>;

    /// Removes and returns the hooks due now, oldest first.
    fn take_due(&self) -> Result<Vec<String>, DatabaseError>;

    fn is_scheduled(&self, hook: &str) -> Result<bool, DatabaseError> {
        Ok(self.next_scheduled(hook)?.is_some())
    }
}

/// Task queue persisted in the `scheduled_tasks` table.
pub struct SqliteTaskQueue {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl SqliteTaskQueue {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

impl TaskQueue for SqliteTaskQueue {
    fn schedule(&self, hook: &str, delay: Duration) -> Result<(), DatabaseError> {
        let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
        let run_at = self.clock.now_millis().saturating_add(delay_ms);
        task_repo::insert(&self.db, hook, run_at)?;
        log::debug!("Scheduled {} in {:?}", hook, delay);
        Ok(())
    }

    fn next_scheduled(&self, hook: &str) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let run_at = task_repo::next_run_at(&self.db, hook)?;
        Ok(run_at.and_then(|ms| Utc.timestamp_millis_opt(ms).single()))
    }

    fn clear(&self, hook: &str) -> Result<usize, DatabaseError> {
        task_repo::delete_hook(&self.db, hook)
    }

    fn take_due(&self) -> Result<Vec<String>, DatabaseError> {
        let due = task_repo::take_due(&self.db, self.clock.now_millis())?;
        Ok(due.into_iter().map(|(hook, _)| hook).collect())
    }
}
