//! The indexing pipeline and the facade that wires it together.
//!
//! [`Indexer`] owns one of each component over a shared [`Database`] and
//! exposes the operations a host needs: run a batch, run the watchdog,
//! and the manual start/stop/restart/re-index controls.

pub mod cache;
pub mod lock;
pub mod progress;
pub mod runner;
pub mod status;
pub mod store;
pub mod watchdog;

#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{
    scanner, Catalog, DocumentScanner, DocumentStatus, ScanReport, PDF_MIME_TYPE,
};
use crate::clock::{Clock, SystemClock};
use crate::config::IndexerConfig;
use crate::db::{default_database_path, Database};
use crate::error::{CatalogError, ConfigError, Result};
use crate::extract::{LopdfExtractor, TextExtractor, TimeLimitedExtractor};
use crate::queue::{SqliteTaskQueue, TaskQueue, INDEX_BATCH_TASK};

pub use cache::ReadThroughCache;
pub use lock::LockManager;
pub use progress::{
    ErrorEntry, ErrorKind, LogEntry, LogStatus, OptionProgressStore, ProgressRecord,
    ProgressStore,
};
pub use runner::{AbortReason, BatchOutcome, BatchRunner};
pub use status::StatusSnapshot;
pub use store::{DocumentStore, SearchHit};
pub use watchdog::{Watchdog, WatchdogOutcome};

pub struct Indexer {
    config: IndexerConfig,
    clock: Arc<dyn Clock>,
    catalog: Catalog,
    store: Arc<DocumentStore>,
    progress: Arc<dyn ProgressStore>,
    queue: Arc<dyn TaskQueue>,
    runner: BatchRunner,
    watchdog: Watchdog,
}

impl Indexer {
    /// Opens the configured database and builds the pipeline with the
    /// lopdf extractor and the system clock.
    pub fn open(config: IndexerConfig) -> Result<Self> {
        let path = match &config.database_path {
            Some(path) => path.clone(),
            None => default_database_path().ok_or_else(|| ConfigError::Validation {
                message: "No database_path configured and no home directory found".to_string(),
            })?,
        };
        let db = Database::open(&path)?;
        let extractor = default_extractor(&config);
        Ok(Self::with_parts(config, db, Arc::new(SystemClock), extractor))
    }

    pub fn with_parts(
        config: IndexerConfig,
        db: Database,
        clock: Arc<dyn Clock>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let catalog = Catalog::new(db.clone(), clock.clone());
        let store = Arc::new(DocumentStore::new(
            db.clone(),
            ReadThroughCache::new(config.cache.ttl()),
            clock.clone(),
        ));
        let progress: Arc<dyn ProgressStore> =
            Arc::new(OptionProgressStore::new(db.clone(), clock.clone()));
        let queue: Arc<dyn TaskQueue> = Arc::new(SqliteTaskQueue::new(db.clone(), clock.clone()));
        let locks = LockManager::new(db.clone(), clock.clone(), config.batch.lock_ttl());

        let runner = BatchRunner::new(
            db,
            catalog.clone(),
            store.clone(),
            progress.clone(),
            queue.clone(),
            extractor,
            locks.clone(),
            clock.clone(),
            config.clone(),
        );
        let watchdog = Watchdog::new(
            store.clone(),
            progress.clone(),
            queue.clone(),
            locks,
            clock.clone(),
            config.clone(),
        );

        Self {
            config,
            clock,
            catalog,
            store,
            progress,
            queue,
            runner,
            watchdog,
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Runs one batch now.
    pub fn run_batch(&self) -> BatchOutcome {
        self.runner.run_batch()
    }

    /// Runs one stall check now.
    pub fn run_watchdog(&self) -> Result<WatchdogOutcome> {
        self.watchdog.check()
    }

    /// Delivers due queued invocations. Several due batch invocations
    /// collapse into one run.
    pub fn run_due(&self) -> Result<Option<BatchOutcome>> {
        let due = self.queue.take_due()?;
        let mut batch_due = false;
        for hook in due {
            if hook == INDEX_BATCH_TASK {
                batch_due = true;
            } else {
                log::warn!("Dropping task with unknown hook '{}'", hook);
            }
        }
        Ok(batch_due.then(|| self.run_batch()))
    }

    /// Schedules an immediate batch unless one is pending or indexing is
    /// disabled. Returns whether a batch was scheduled.
    pub fn start(&self) -> Result<bool> {
        if !self.config.indexing.enabled {
            log::info!("Indexing is disabled, not starting");
            return Ok(false);
        }
        self.ensure_batch_scheduled(Duration::ZERO)
    }

    /// Clears pending batches and resets progress. A batch already running
    /// finishes its document but does not re-arm.
    pub fn stop(&self) -> Result<usize> {
        let cleared = self.queue.clear(INDEX_BATCH_TASK)?;
        let mut progress = self.progress.get()?;
        progress.reset_stopped(self.clock.now());
        self.progress.set(&progress)?;
        log::info!("Indexing stopped, {} pending batch(es) cleared", cleared);
        Ok(cleared)
    }

    /// Manual escape hatch for a stalled or valve-stopped run.
    pub fn restart(&self) -> Result<()> {
        self.queue.clear(INDEX_BATCH_TASK)?;

        let now = self.clock.now();
        let mut progress = self.progress.get()?;
        progress.consecutive_errors = 0;
        progress.beat(now);
        progress.push_log(
            LogEntry {
                file: progress.current_file.clone(),
                status: LogStatus::RestartedManually,
                timestamp: now,
            },
            self.config.progress.log_capacity,
        );
        self.progress.set(&progress)?;

        let delay = self.config.batch.restart_delay();
        self.queue.schedule(INDEX_BATCH_TASK, delay)?;
        log::info!("Indexing restarted manually, next batch in {}s", delay.as_secs());
        Ok(())
    }

    /// Drops all indexed text and status flags and indexes from scratch.
    pub fn reindex_all(&self) -> Result<()> {
        let removed = self.store.truncate()?;
        self.catalog.clear_all_meta()?;

        let mut progress = self.progress.get()?;
        progress.reset_run(self.clock.now());
        progress.consecutive_errors = 0;
        self.progress.set(&progress)?;

        self.queue.clear(INDEX_BATCH_TASK)?;
        self.queue.schedule(INDEX_BATCH_TASK, Duration::ZERO)?;
        log::info!("Cleared {} indexed documents, re-indexing started", removed);
        Ok(())
    }

    /// Queues a document for (re)indexing after an upload or edit.
    /// Returns false when indexing is disabled or the document is not a PDF.
    pub fn index_document(&self, id: i64) -> Result<bool> {
        if !self.config.indexing.enabled {
            return Ok(false);
        }
        let document = self
            .catalog
            .find(id)?
            .ok_or(CatalogError::NotFound(id))?;
        if !document.is_pdf() {
            return Ok(false);
        }

        self.store.remove(id)?;
        self.catalog.reset_failures(id)?;
        self.catalog.set_status(id, DocumentStatus::Pending)?;
        self.ensure_batch_scheduled(Duration::ZERO)?;
        Ok(true)
    }

    /// Adds a file to the catalog and queues it. Already-known paths return
    /// their existing id.
    pub fn register_document(&self, path: &Path, title: Option<&str>) -> Result<i64> {
        let id = match self.catalog.find_by_path(path)? {
            Some(existing) => existing.id,
            None => {
                let title = title
                    .map(str::to_string)
                    .or_else(|| {
                        path.file_stem()
                            .and_then(|s| s.to_str())
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| "untitled".to_string());
                let mime_type = if scanner::is_pdf(path) {
                    PDF_MIME_TYPE.to_string()
                } else {
                    mime_guess::from_path(path)
                        .first_or_octet_stream()
                        .to_string()
                };
                self.catalog.register(&title, path, &mime_type)?
            }
        };
        self.store.invalidate();
        self.index_document(id)?;
        Ok(id)
    }

    /// Registers every new PDF under `dir` and queues a batch if any were found.
    pub fn scan(&self, dir: &Path) -> Result<ScanReport> {
        let report = DocumentScanner::new(dir).scan(&self.catalog)?;
        self.store.invalidate();
        if !report.registered.is_empty() && self.config.indexing.enabled {
            self.ensure_batch_scheduled(Duration::ZERO)?;
        }
        Ok(report)
    }

    pub fn status(&self) -> Result<StatusSnapshot> {
        StatusSnapshot::collect(
            self.config.indexing.enabled,
            self.progress.as_ref(),
            &self.store,
            &self.catalog,
            self.queue.as_ref(),
        )
    }

    pub fn search(&self, query: &str, limit: u64) -> Result<Vec<SearchHit>> {
        Ok(self.store.search(query, limit)?)
    }

    fn ensure_batch_scheduled(&self, delay: Duration) -> Result<bool> {
        if self.queue.is_scheduled(INDEX_BATCH_TASK)? {
            return Ok(false);
        }
        self.queue.schedule(INDEX_BATCH_TASK, delay)?;
        Ok(true)
    }
}

/// The lopdf extractor bounded by the configured parse timeout.
pub fn default_extractor(config: &IndexerConfig) -> Arc<dyn TextExtractor> {
    let lopdf = LopdfExtractor::new(
        config.indexing.hard_limit_bytes(),
        config.indexing.limited_page_cap,
    );
    Arc::new(TimeLimitedExtractor::new(
        Arc::new(lopdf),
        config.indexing.parse_timeout(),
    ))
}
