//! Read-only status snapshot for polling clients.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::{Catalog, DocumentStatus};
use crate::error::IndexerError;
use crate::indexer::progress::{ProgressRecord, ProgressStore};
use crate::indexer::store::DocumentStore;
use crate::queue::{TaskQueue, INDEX_BATCH_TASK};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub enabled: bool,
    pub progress: ProgressRecord,
    pub total_documents: u64,
    pub indexed_documents: u64,
    pub secured_documents: u64,
    pub failed_documents: u64,
    pub pending_documents: u64,
    /// Indexed share of all documents, one decimal.
    pub percentage: f64,
    pub next_batch_at: Option<DateTime<Utc>>,
    pub process_status: String,
}

impl StatusSnapshot {
    pub fn collect(
        enabled: bool,
        progress: &dyn ProgressStore,
        store: &DocumentStore,
        catalog: &Catalog,
        queue: &dyn TaskQueue,
    ) -> Result<Self, IndexerError> {
        let total_documents = store.count_total()?;
        let indexed_documents = store.count_indexed()?;
        let next_batch_at = queue.next_scheduled(INDEX_BATCH_TASK)?;

        Ok(Self {
            enabled,
            progress: progress.get()?,
            total_documents,
            indexed_documents,
            secured_documents: catalog.count_with_status(DocumentStatus::Secured)?,
            failed_documents: catalog.count_with_status(DocumentStatus::Failed)?,
            pending_documents: total_documents.saturating_sub(indexed_documents),
            percentage: percentage(indexed_documents, total_documents),
            process_status: process_status(next_batch_at),
            next_batch_at,
        })
    }
}

pub fn percentage(indexed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (indexed as f64 / total as f64 * 1000.0).round() / 10.0
}

/// `Active (next batch at HH:MM:SS)` while a batch is pending, else `Inactive`.
pub fn process_status(next_batch_at: Option<DateTime<Utc>>) -> String {
    match next_batch_at {
        Some(at) => format!("Active (next batch at {})", at.format("%H:%M:%S")),
        None => "Inactive".to_string(),
    }
}
