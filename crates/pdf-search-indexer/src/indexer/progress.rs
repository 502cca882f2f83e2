//! Progress tracker: the single record describing the current or most
//! recent indexing run.
//!
//! The record is read and written only while the batch lock is held; the
//! store itself does no concurrency control.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::DocumentStatus;
use crate::clock::Clock;
use crate::db::{option_repo, Database, DatabaseError};

/// Option name the record is persisted under.
pub const PROGRESS_OPTION: &str = "pdf_search_indexer_progress";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Completed,
    Secured,
    Failed,
    RestartedByWatchdog,
    RestartedManually,
}

impl From<DocumentStatus> for LogStatus {
    fn from(status: DocumentStatus) -> Self {
        match status {
            DocumentStatus::Secured => LogStatus::Secured,
            DocumentStatus::Failed => LogStatus::Failed,
            _ => LogStatus::Completed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Secured,
    Oversized,
    Partial,
    ParseError,
    StoreWriteError,
    MissingFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub file: String,
    pub status: LogStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub file: String,
    pub kind: ErrorKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressRecord {
    /// File name being processed; empty when idle.
    pub current_file: String,
    pub started_at: Option<DateTime<Utc>>,
    pub last_update: Option<DateTime<Utc>>,
    /// Last liveness signal. Only the watchdog reads it.
    pub heartbeat: Option<DateTime<Utc>>,
    pub processed_count: u64,
    pub total_count: u64,
    pub batch_number: u64,
    pub consecutive_errors: u32,
    /// Newest first.
    pub log: Vec<LogEntry>,
    /// Newest first.
    pub errors: Vec<ErrorEntry>,
    /// Bumped by every manual stop. A batch that sees it change while
    /// running neither writes progress nor re-arms.
    pub stop_generation: u64,
}

impl ProgressRecord {
    pub fn push_log(&mut self, entry: LogEntry, capacity: usize) {
        self.log.insert(0, entry);
        self.log.truncate(capacity);
    }

    pub fn push_error(&mut self, entry: ErrorEntry, capacity: usize) {
        self.errors.insert(0, entry);
        self.errors.truncate(capacity);
    }

    /// Refreshes the heartbeat.
    pub fn beat(&mut self, now: DateTime<Utc>) {
        self.heartbeat = Some(now);
        self.last_update = Some(now);
    }

    /// Whether this batch opens a new run.
    pub fn is_first_batch(&self) -> bool {
        self.batch_number == 1 || self.started_at.is_none()
    }

    /// Clears the run-scoped fields once the queue is drained. The heartbeat
    /// and the log windows survive.
    pub fn reset_run(&mut self, now: DateTime<Utc>) {
        self.current_file.clear();
        self.started_at = None;
        self.batch_number = 0;
        self.processed_count = 0;
        self.total_count = 0;
        self.last_update = Some(now);
    }

    /// Clears everything but the log windows. The run is no longer alive.
    pub fn reset_stopped(&mut self, now: DateTime<Utc>) {
        self.reset_run(now);
        self.heartbeat = None;
        self.consecutive_errors = 0;
        self.stop_generation = self.stop_generation.wrapping_add(1);
    }

    pub fn heartbeat_age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.heartbeat.map(|beat| now - beat)
    }
}

/// Persistence for the progress record.
pub trait ProgressStore: Send + Sync {
    fn get(&self) -> Result<ProgressRecord, DatabaseError>;
    fn set(&self, record: &ProgressRecord) -> Result<(), DatabaseError>;
}

/// Keeps the record as a JSON option row.
pub struct OptionProgressStore {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl OptionProgressStore {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

impl ProgressStore for OptionProgressStore {
    fn get(&self) -> Result<ProgressRecord, DatabaseError> {
        Ok(option_repo::get(&self.db, PROGRESS_OPTION)?.unwrap_or_default())
    }

    fn set(&self, record: &ProgressRecord) -> Result<(), DatabaseError> {
        option_repo::set(
            &self.db,
            PROGRESS_OPTION,
            record,
            &self.clock.now().to_rfc3339(),
        )
    }
}
