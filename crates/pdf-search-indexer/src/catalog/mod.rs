//! Document source catalog: the set of known documents and the status
//! flags kept beside each one.

pub mod scanner;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::db::document_repo::{self, DocumentRow};
use crate::db::Database;
use crate::error::CatalogError;

pub use document_repo::PDF_MIME_TYPE;
pub use scanner::{DocumentScanner, ScanReport};

/// Per-document indexing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Secured,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Secured => "secured",
            DocumentStatus::Failed => "failed",
        }
    }

    /// Whether the document has reached a final state for this content.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Completed | DocumentStatus::Secured | DocumentStatus::Failed
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentStatus::Pending),
            "processing" => Ok(DocumentStatus::Processing),
            "completed" => Ok(DocumentStatus::Completed),
            "secured" => Ok(DocumentStatus::Secured),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(format!("unknown document status '{}'", other)),
        }
    }
}

/// A document known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub file_path: PathBuf,
    pub mime_type: String,
    pub created_at: String,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            file_path: PathBuf::from(row.file_path),
            mime_type: row.mime_type,
            created_at: row.created_at,
        }
    }
}

impl Document {
    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME_TYPE
    }
}

/// Catalog backed by the `documents` and `document_meta` tables.
#[derive(Clone)]
pub struct Catalog {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl Catalog {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    fn timestamp(&self) -> String {
        self.clock.now().to_rfc3339()
    }

    /// Adds a document and returns its id.
    pub fn register(&self, title: &str, path: &Path, mime_type: &str) -> Result<i64, CatalogError> {
        let file_path = path.to_string_lossy();
        let id = document_repo::insert(&self.db, title, &file_path, mime_type, &self.timestamp())?;
        log::debug!("Registered document {} ({})", id, mime_type);
        Ok(id)
    }

    pub fn find(&self, id: i64) -> Result<Option<Document>, CatalogError> {
        Ok(document_repo::find_by_id(&self.db, id)?.map(Document::from))
    }

    pub fn find_by_path(&self, path: &Path) -> Result<Option<Document>, CatalogError> {
        let file_path = path.to_string_lossy();
        Ok(document_repo::find_by_path(&self.db, &file_path)?.map(Document::from))
    }

    /// Resolves a document id to its backing file.
    pub fn resolve_path(&self, id: i64) -> Result<PathBuf, CatalogError> {
        self.find(id)?
            .map(|doc| doc.file_path)
            .ok_or(CatalogError::NotFound(id))
    }

    pub fn count_pdfs(&self) -> Result<u64, CatalogError> {
        Ok(document_repo::count_pdfs(&self.db)?)
    }

    pub fn list(&self, limit: u64) -> Result<Vec<Document>, CatalogError> {
        Ok(document_repo::list_pdfs(&self.db, limit)?
            .into_iter()
            .map(Document::from)
            .collect())
    }

    /// Status flag of a document. Documents never touched are pending.
    pub fn status(&self, id: i64) -> Result<DocumentStatus, CatalogError> {
        let meta = document_repo::find_meta(&self.db, id)?;
        Ok(meta
            .and_then(|m| m.status.parse().ok())
            .unwrap_or(DocumentStatus::Pending))
    }

    pub fn failed_count(&self, id: i64) -> Result<u32, CatalogError> {
        Ok(document_repo::find_meta(&self.db, id)?
            .map(|m| m.failed_count)
            .unwrap_or(0))
    }

    pub fn set_status(&self, id: i64, status: DocumentStatus) -> Result<(), CatalogError> {
        let now = self.timestamp();
        let indexed_at = status.is_terminal().then_some(now.as_str());
        document_repo::upsert_status(&self.db, id, status.as_str(), indexed_at, &now)?;
        Ok(())
    }

    /// Records one more consecutive failure. Returns the new count.
    pub fn record_failure(&self, id: i64) -> Result<u32, CatalogError> {
        Ok(document_repo::increment_failures(&self.db, id, &self.timestamp())?)
    }

    pub fn reset_failures(&self, id: i64) -> Result<(), CatalogError> {
        document_repo::reset_failures(&self.db, id, &self.timestamp())?;
        Ok(())
    }

    pub fn count_with_status(&self, status: DocumentStatus) -> Result<u64, CatalogError> {
        Ok(document_repo::count_by_status(&self.db, status.as_str())?)
    }

    /// Drops every status flag and failure counter.
    pub fn clear_all_meta(&self) -> Result<usize, CatalogError> {
        Ok(document_repo::delete_all_meta(&self.db)?)
    }
}
