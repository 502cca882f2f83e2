//! Batch runner: one document per invocation, re-armed through the task
//! queue until the catalog is drained.

use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{Catalog, DocumentStatus};
use crate::clock::Clock;
use crate::config::IndexerConfig;
use crate::db::Database;
use crate::error::IndexerError;
use crate::extract::{placeholder, ExtractOutcome, TextExtractor};
use crate::indexer::lock::LockManager;
use crate::indexer::progress::{ErrorEntry, ErrorKind, LogEntry, LogStatus, ProgressRecord, ProgressStore};
use crate::indexer::store::DocumentStore;
use crate::queue::{TaskQueue, INDEX_BATCH_TASK};
use crate::sanitize::redact_path;

/// Why a batch stopped without doing its unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The database did not answer the health probe.
    Unhealthy(String),
    /// Too many error batches in a row; the chain is not re-armed.
    SafetyValve { consecutive_errors: u32 },
    /// Indexing was stopped while the batch ran. The document was finished
    /// but progress was left as the stop wrote it.
    Stopped,
    /// An internal error interrupted the batch.
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Work remains; the next batch runs after `delay`.
    Continue { delay: Duration },
    /// Nothing left to index; run-scoped progress was reset.
    Drained,
    /// Stopped early. Nothing was re-armed.
    Aborted(AbortReason),
    /// Another batch holds the lock.
    Busy,
}

/// Result of the single unit of work inside a batch.
struct UnitResult {
    error: bool,
}

pub struct BatchRunner {
    db: Database,
    catalog: Catalog,
    store: Arc<DocumentStore>,
    progress: Arc<dyn ProgressStore>,
    queue: Arc<dyn TaskQueue>,
    extractor: Arc<dyn TextExtractor>,
    locks: LockManager,
    clock: Arc<dyn Clock>,
    config: IndexerConfig,
}

impl BatchRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        catalog: Catalog,
        store: Arc<DocumentStore>,
        progress: Arc<dyn ProgressStore>,
        queue: Arc<dyn TaskQueue>,
        extractor: Arc<dyn TextExtractor>,
        locks: LockManager,
        clock: Arc<dyn Clock>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            db,
            catalog,
            store,
            progress,
            queue,
            extractor,
            locks,
            clock,
            config,
        }
    }

    /// Runs one batch. Never fails: every error ends up in the outcome.
    pub fn run_batch(&self) -> BatchOutcome {
        let span = tracing::info_span!("batch");
        let _enter = span.enter();

        if let Err(e) = self.db.ping() {
            log::error!("Database unavailable, skipping batch: {}", e);
            return BatchOutcome::Aborted(AbortReason::Unhealthy(e.to_string()));
        }

        let lock = match self.locks.try_acquire() {
            Ok(Some(lock)) => lock,
            Ok(None) => {
                log::debug!("Another batch is running, exiting");
                return BatchOutcome::Busy;
            }
            Err(e) => {
                log::error!("Failed to take the batch lock: {}", e);
                return BatchOutcome::Aborted(AbortReason::Internal(e.to_string()));
            }
        };

        let outcome = match self.step() {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Batch failed: {}", e);
                BatchOutcome::Aborted(AbortReason::Internal(e.to_string()))
            }
        };

        if let Err(e) = lock.release() {
            log::warn!("Failed to release the batch lock: {}", e);
        }

        outcome
    }

    fn step(&self) -> Result<BatchOutcome, IndexerError> {
        let mut progress = self.progress.get()?;
        let now = self.clock.now();

        if progress.consecutive_errors > self.config.batch.max_consecutive_errors {
            let consecutive_errors = progress.consecutive_errors;
            log::error!(
                "Too many consecutive errors ({}), stopping batch processing",
                consecutive_errors
            );
            progress.consecutive_errors = 0;
            progress.last_update = Some(now);
            self.progress.set(&progress)?;
            return Ok(BatchOutcome::Aborted(AbortReason::SafetyValve {
                consecutive_errors,
            }));
        }

        // Catalog rows may have been added by another process.
        self.store.invalidate();
        let generation = progress.stop_generation;

        progress.batch_number += 1;
        progress.last_update = Some(now);
        if progress.is_first_batch() {
            progress.started_at = Some(now);
            progress.total_count = self.store.count_total()?;
            progress.processed_count = self.store.count_indexed()?;
            log::info!(
                "Starting indexing run: {} of {} documents already indexed",
                progress.processed_count,
                progress.total_count
            );
        }

        let Some(id) = self.store.next_unindexed_id()? else {
            return self.drain(progress);
        };

        let unit = self.process_document(id, &mut progress)?;
        progress.consecutive_errors = if unit.error {
            progress.consecutive_errors.saturating_add(1)
        } else {
            0
        };

        if self.stopped_since(generation)? {
            return Ok(self.stopped(&progress));
        }

        if self.store.next_unindexed_id()?.is_none() {
            return self.drain(progress);
        }

        let delay = self.config.batch.backoff_delay(progress.consecutive_errors);
        progress.current_file.clear();
        progress.beat(self.clock.now());
        self.progress.set(&progress)?;

        if self.stopped_since(generation)? {
            return Ok(self.stopped(&progress));
        }
        if self.queue.is_scheduled(INDEX_BATCH_TASK)? {
            log::debug!("Next batch already pending");
        } else {
            self.queue.schedule(INDEX_BATCH_TASK, delay)?;
            log::debug!(
                "Batch {} done, next in {}s",
                progress.batch_number,
                delay.as_secs()
            );
        }

        Ok(BatchOutcome::Continue { delay })
    }

    /// Whether `stop` ran since the batch read the progress record.
    fn stopped_since(&self, generation: u64) -> Result<bool, IndexerError> {
        Ok(self.progress.get()?.stop_generation != generation)
    }

    fn stopped(&self, progress: &ProgressRecord) -> BatchOutcome {
        log::info!(
            "Indexing stopped during batch {}, not re-arming",
            progress.batch_number
        );
        BatchOutcome::Aborted(AbortReason::Stopped)
    }

    fn drain(&self, mut progress: ProgressRecord) -> Result<BatchOutcome, IndexerError> {
        log::info!("Indexing complete, no unindexed documents remain");
        progress.reset_run(self.clock.now());
        self.progress.set(&progress)?;
        Ok(BatchOutcome::Drained)
    }

    fn process_document(
        &self,
        id: i64,
        progress: &mut ProgressRecord,
    ) -> Result<UnitResult, IndexerError> {
        let path = self.catalog.resolve_path(id)?;
        let file = redact_path(&path);

        if !path.exists() {
            log::warn!("File missing on disk: {} (document {})", file, id);
            self.write_placeholder(id, &file, placeholder::MISSING_FILE);
            self.catalog.set_status(id, DocumentStatus::Failed)?;
            self.push_error(progress, &file, ErrorKind::MissingFile, "File missing on disk");
            self.push_log(progress, &file, LogStatus::Failed);
            progress.processed_count += 1;
            return Ok(UnitResult { error: true });
        }

        progress.current_file = file.clone();
        progress.beat(self.clock.now());
        self.progress.set(progress)?;
        self.catalog.set_status(id, DocumentStatus::Processing)?;

        let result = self
            .extractor
            .extract(&path, self.config.indexing.max_size_bytes());

        match &result.outcome {
            ExtractOutcome::ParseError { message } => {
                self.push_error(progress, &file, ErrorKind::ParseError, message);
                return self.record_failure(id, &file, message, progress);
            }
            ExtractOutcome::Secured => {
                self.push_error(progress, &file, ErrorKind::Secured, &result.content);
            }
            ExtractOutcome::Oversized { .. } => {
                self.push_error(progress, &file, ErrorKind::Oversized, &result.content);
            }
            ExtractOutcome::Partial { message } => {
                self.push_error(progress, &file, ErrorKind::Partial, message);
            }
            ExtractOutcome::Full | ExtractOutcome::Limited { .. } => {}
        }

        if let Err(e) = self.store.upsert(id, &result.content) {
            let message = e.to_string();
            log::error!("Failed to store text of {}: {}", file, message);
            self.push_error(progress, &file, ErrorKind::StoreWriteError, &message);
            return self.record_failure(id, &file, &message, progress);
        }

        let status = if result.is_secured() {
            DocumentStatus::Secured
        } else {
            DocumentStatus::Completed
        };
        self.catalog.reset_failures(id)?;
        self.catalog.set_status(id, status)?;
        self.push_log(progress, &file, status.into());
        progress.processed_count += 1;
        log::info!("Indexed {} ({})", file, status);

        Ok(UnitResult { error: false })
    }

    /// Counts a failed attempt. The document stays pending until it runs
    /// out of attempts, then gets placeholder text and is marked failed.
    fn record_failure(
        &self,
        id: i64,
        file: &str,
        message: &str,
        progress: &mut ProgressRecord,
    ) -> Result<UnitResult, IndexerError> {
        let failures = self.catalog.record_failure(id)?;
        let max = self.config.batch.max_document_failures;

        if failures >= max {
            log::error!("Giving up on {} after {} failed attempts", file, failures);
            self.write_placeholder(id, file, &placeholder::gave_up(file, failures, message));
            self.catalog.set_status(id, DocumentStatus::Failed)?;
            self.push_log(progress, file, LogStatus::Failed);
            progress.processed_count += 1;
        } else {
            log::warn!(
                "Indexing {} failed (attempt {}/{}): {}",
                file,
                failures,
                max,
                message
            );
            self.catalog.set_status(id, DocumentStatus::Pending)?;
        }

        Ok(UnitResult { error: true })
    }

    /// Stores terminal placeholder text. A failed write is logged only: the
    /// `failed` status alone keeps the document out of later selections.
    fn write_placeholder(&self, id: i64, file: &str, content: &str) {
        if let Err(e) = self.store.upsert(id, content) {
            log::error!("Failed to store placeholder for {}: {}", file, e);
        }
    }

    fn push_log(&self, progress: &mut ProgressRecord, file: &str, status: LogStatus) {
        progress.push_log(
            LogEntry {
                file: file.to_string(),
                status,
                timestamp: self.clock.now(),
            },
            self.config.progress.log_capacity,
        );
    }

    fn push_error(&self, progress: &mut ProgressRecord, file: &str, kind: ErrorKind, message: &str) {
        progress.push_error(
            ErrorEntry {
                file: file.to_string(),
                kind,
                message: message.to_string(),
                timestamp: self.clock.now(),
            },
            self.config.progress.log_capacity,
        );
    }
}
