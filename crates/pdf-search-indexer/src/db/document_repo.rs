//! Document repository: the document catalog (`documents`) and the
//! per-document status flags kept beside it (`document_meta`).

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// MIME type of the documents the indexer works on.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A raw document row from the catalog.
#[derive(Debug, Clone)]
pub struct DocumentRow {
    pub id: i64,
    pub title: String,
    pub file_path: String,
    pub mime_type: String,
    pub created_at: String,
}

impl DocumentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            file_path: row.get("file_path")?,
            mime_type: row.get("mime_type")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// A raw status row from `document_meta`.
#[derive(Debug, Clone)]
pub struct MetaRow {
    pub document_id: i64,
    pub status: String,
    pub failed_count: u32,
    pub indexed_at: Option<String>,
    pub updated_at: String,
}

impl MetaRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            document_id: row.get("document_id")?,
            status: row.get("status")?,
            failed_count: row.get("failed_count")?,
            indexed_at: row.get("indexed_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new document and returns its assigned id.
pub fn insert(
    db: &Database,
    title: &str,
    file_path: &str,
    mime_type: &str,
    created_at: &str,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO documents (title, file_path, mime_type, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![title, file_path, mime_type, created_at],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Finds a document by its id.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<DocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM documents WHERE id = ?1",
                params![id],
                DocumentRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Finds a document by its backing file path.
pub fn find_by_path(db: &Database, file_path: &str) -> Result<Option<DocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM documents WHERE file_path = ?1",
                params![file_path],
                DocumentRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Lists PDF documents in ascending id order.
pub fn list_pdfs(db: &Database, limit: u64) -> Result<Vec<DocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM documents WHERE mime_type = ?1 ORDER BY id ASC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![PDF_MIME_TYPE, limit as i64], DocumentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts all PDF documents in the catalog.
pub fn count_pdfs(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE mime_type = ?1",
            params![PDF_MIME_TYPE],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Returns the status row of a document, if one was ever written.
pub fn find_meta(db: &Database, document_id: i64) -> Result<Option<MetaRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM document_meta WHERE document_id = ?1",
                params![document_id],
                MetaRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Sets the status flag of a document. `indexed_at` is only overwritten
/// when a value is given.
pub fn upsert_status(
    db: &Database,
    document_id: i64,
    status: &str,
    indexed_at: Option<&str>,
    updated_at: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO document_meta (document_id, status, failed_count, indexed_at, updated_at)
             VALUES (?1, ?2, 0, ?3, ?4)
             ON CONFLICT(document_id) DO UPDATE SET
               status = excluded.status,
               indexed_at = COALESCE(excluded.indexed_at, document_meta.indexed_at),
               updated_at = excluded.updated_at",
            params![document_id, status, indexed_at, updated_at],
        )?;
        Ok(())
    })
}

/// Increments the consecutive failure counter and returns the new value.
pub fn increment_failures(
    db: &Database,
    document_id: i64,
    updated_at: &str,
) -> Result<u32, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO document_meta (document_id, status, failed_count, updated_at)
             VALUES (?1, 'pending', 1, ?2)
             ON CONFLICT(document_id) DO UPDATE SET
               failed_count = document_meta.failed_count + 1,
               updated_at = excluded.updated_at",
            params![document_id, updated_at],
        )?;
        let count: u32 = conn.query_row(
            "SELECT failed_count FROM document_meta WHERE document_id = ?1",
            params![document_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Resets the consecutive failure counter to zero.
pub fn reset_failures(
    db: &Database,
    document_id: i64,
    updated_at: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE document_meta SET failed_count = 0, updated_at = ?2 WHERE document_id = ?1",
            params![document_id, updated_at],
        )?;
        Ok(())
    })
}

/// Counts documents currently flagged with the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM document_meta WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Removes every status row. Used by the full re-index.
pub fn delete_all_meta(db: &Database) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| Ok(conn.execute("DELETE FROM document_meta", [])?))
}
