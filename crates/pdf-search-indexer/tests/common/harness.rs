//! Test harness wiring a real lopdf-backed indexer over temp storage.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use pdf_search_indexer::indexer::default_extractor;
use pdf_search_indexer::{BatchOutcome, Database, Indexer, IndexerConfig, ManualClock};

/// Upper bound on batches a drain may take before a test gives up.
const MAX_BATCHES: usize = 100;

pub struct TestHarness {
    temp_dir: TempDir,
    /// Directory fixtures are written to.
    pub docs_dir: PathBuf,
    pub clock: Arc<ManualClock>,
    pub indexer: Indexer,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(IndexerConfig::default())
    }

    pub fn with_config(config: IndexerConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let docs_dir = temp_dir.path().join("docs");
        std::fs::create_dir_all(&docs_dir).expect("Failed to create docs directory");

        let db_path = temp_dir.path().join("index.db");
        let db = Database::open(&db_path).expect("Failed to open database");
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 4, 4, 9, 0, 0).unwrap(),
        ));
        let extractor = default_extractor(&config);
        let indexer = Indexer::with_parts(config, db, clock.clone(), extractor);

        Self {
            temp_dir,
            docs_dir,
            clock,
            indexer,
        }
    }

    /// Writes `bytes` under the docs directory and returns the path.
    pub fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.docs_dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        std::fs::write(&path, bytes).expect("Failed to write fixture");
        path
    }

    /// Writes and registers a document.
    pub fn add(&self, name: &str, bytes: &[u8]) -> i64 {
        let path = self.write(name, bytes);
        self.indexer
            .register_document(&path, None)
            .expect("Failed to register document")
    }

    /// Delivers queued batches until the queue drains, advancing the clock
    /// past each backoff delay. Returns the number of batches run.
    pub fn drain(&self) -> usize {
        for batch in 1..=MAX_BATCHES {
            match self.indexer.run_due().expect("Failed to read the task queue") {
                Some(BatchOutcome::Drained) => return batch,
                Some(BatchOutcome::Continue { delay }) => self.clock.advance(delay),
                Some(other) => panic!("Unexpected batch outcome: {:?}", other),
                None => panic!("No batch was due after {} batches", batch - 1),
            }
        }
        panic!("Queue did not drain within {} batches", MAX_BATCHES);
    }
}
