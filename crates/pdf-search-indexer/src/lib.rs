pub mod catalog;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod host;
pub mod indexer;
pub mod queue;
pub mod sanitize;

pub use catalog::{Catalog, Document, DocumentScanner, DocumentStatus, ScanReport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_config, load_config_from_str, IndexerConfig};
pub use db::{Database, DatabaseError};
pub use error::{CatalogError, ConfigError, ExtractError, IndexerError, Result};
pub use extract::{ExtractOutcome, LopdfExtractor, TextExtractor, TextResult};
pub use host::{HostCommand, HostScheduler};
pub use indexer::{
    BatchOutcome, Indexer, ProgressRecord, SearchHit, StatusSnapshot, WatchdogOutcome,
};
pub use queue::{SqliteTaskQueue, TaskQueue, INDEX_BATCH_TASK};
