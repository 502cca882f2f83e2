//! Shared fixtures for the indexer's unit tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use crate::catalog::{Catalog, PDF_MIME_TYPE};
use crate::clock::ManualClock;
use crate::config::IndexerConfig;
use crate::db::Database;
use crate::extract::{placeholder, ExtractOutcome, TextExtractor, TextResult};
use crate::indexer::cache::ReadThroughCache;
use crate::indexer::lock::LockManager;
use crate::indexer::progress::OptionProgressStore;
use crate::indexer::runner::BatchRunner;
use crate::indexer::store::DocumentStore;
use crate::indexer::watchdog::Watchdog;
use crate::queue::{SqliteTaskQueue, INDEX_BATCH_TASK};
use crate::sanitize::redact_path;

#[derive(Debug, Clone)]
pub enum Script {
    Text(&'static str),
    ParseError(&'static str),
    Secured,
}

/// Extractor whose results are scripted per file name.
#[derive(Default)]
pub struct StubExtractor {
    scripts: Mutex<HashMap<String, Script>>,
}

impl StubExtractor {
    pub fn script(&self, file: &str, script: Script) {
        self.scripts.lock().unwrap().insert(file.to_string(), script);
    }
}

impl TextExtractor for StubExtractor {
    fn extract(&self, path: &Path, _max_normal_size: u64) -> TextResult {
        let file = redact_path(path);
        let script = self.scripts.lock().unwrap().get(&file).cloned();
        match script {
            Some(Script::Text(text)) => TextResult::new(text, ExtractOutcome::Full),
            Some(Script::ParseError(message)) => TextResult::new(
                placeholder::parse_error(message),
                ExtractOutcome::ParseError {
                    message: message.to_string(),
                },
            ),
            Some(Script::Secured) => {
                TextResult::new(placeholder::secured(&file), ExtractOutcome::Secured)
            }
            None => TextResult::new(format!("text of {}", file), ExtractOutcome::Full),
        }
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub db: Database,
    pub clock: Arc<ManualClock>,
    pub config: IndexerConfig,
    pub catalog: Catalog,
    pub store: Arc<DocumentStore>,
    pub progress: Arc<OptionProgressStore>,
    pub queue: Arc<SqliteTaskQueue>,
    pub locks: LockManager,
    pub extractor: Arc<StubExtractor>,
    pub runner: BatchRunner,
    pub watchdog: Watchdog,
}

impl Harness {
    pub fn new() -> Self {
        let config = IndexerConfig::default();
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 4, 4, 12, 0, 0).unwrap(),
        ));

        let catalog = Catalog::new(db.clone(), clock.clone());
        let store = Arc::new(DocumentStore::new(
            db.clone(),
            ReadThroughCache::new(config.cache.ttl()),
            clock.clone(),
        ));
        let progress = Arc::new(OptionProgressStore::new(db.clone(), clock.clone()));
        let queue = Arc::new(SqliteTaskQueue::new(db.clone(), clock.clone()));
        let locks = LockManager::new(db.clone(), clock.clone(), config.batch.lock_ttl());
        let extractor = Arc::new(StubExtractor::default());

        let runner = BatchRunner::new(
            db.clone(),
            catalog.clone(),
            store.clone(),
            progress.clone(),
            queue.clone(),
            extractor.clone(),
            locks.clone(),
            clock.clone(),
            config.clone(),
        );
        let watchdog = Watchdog::new(
            store.clone(),
            progress.clone(),
            queue.clone(),
            locks.clone(),
            clock.clone(),
            config.clone(),
        );

        Self {
            dir,
            db,
            clock,
            config,
            catalog,
            store,
            progress,
            queue,
            locks,
            extractor,
            runner,
            watchdog,
        }
    }

    /// Writes a file and registers it as a PDF document.
    pub fn add_file(&self, name: &str) -> i64 {
        let path = self.dir.path().join(name);
        std::fs::write(&path, b"%PDF-1.4 stub").unwrap();
        let id = self.catalog.register(name, &path, PDF_MIME_TYPE).unwrap();
        self.store.invalidate();
        id
    }

    /// Registers a document whose file does not exist.
    pub fn add_missing(&self, name: &str) -> i64 {
        let path = self.dir.path().join("vanished").join(name);
        let id = self.catalog.register(name, &path, PDF_MIME_TYPE).unwrap();
        self.store.invalidate();
        id
    }

    pub fn pending_batches(&self) -> u32 {
        self.db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM scheduled_tasks WHERE hook = ?1",
                    [INDEX_BATCH_TASK],
                    |r| r.get(0),
                )?)
            })
            .unwrap()
    }
}
