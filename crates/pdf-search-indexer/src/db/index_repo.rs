//! Search index repository: the `search_index` table that holds the
//! extracted text of each document.

use rusqlite::{params, OptionalExtension};

use super::document_repo::PDF_MIME_TYPE;
use super::{Database, DatabaseError};

/// One search result row.
#[derive(Debug, Clone)]
pub struct SearchRow {
    pub id: i64,
    pub title: String,
    pub content: String,
}

/// Inserts or replaces the indexed content of a document.
///
/// `attachment_id` is the primary key, so a second call for the same id
/// overwrites the first instead of adding a row.
pub fn upsert(
    db: &Database,
    attachment_id: i64,
    content: &str,
    indexed_at: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO search_index (attachment_id, content, indexed_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(attachment_id) DO UPDATE SET
               content = excluded.content,
               indexed_at = excluded.indexed_at",
            params![attachment_id, content, indexed_at],
        )?;
        Ok(())
    })
}

/// Removes the index row of a document. Returns whether a row existed.
pub fn delete(db: &Database, attachment_id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let removed = conn.execute(
            "DELETE FROM search_index WHERE attachment_id = ?1",
            params![attachment_id],
        )?;
        Ok(removed > 0)
    })
}

/// Returns the indexed content of a document.
pub fn find_content(db: &Database, attachment_id: i64) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let content = conn
            .query_row(
                "SELECT content FROM search_index WHERE attachment_id = ?1",
                params![attachment_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(content)
    })
}

/// Lowest PDF id in the catalog that has no index row yet. Documents
/// flagged `failed` are skipped even when their placeholder never landed.
pub fn next_unindexed_id(db: &Database) -> Result<Option<i64>, DatabaseError> {
    db.with_conn(|conn| {
        let id = conn
            .query_row(
                "SELECT d.id FROM documents d
                 LEFT JOIN search_index s ON s.attachment_id = d.id
                 LEFT JOIN document_meta m ON m.document_id = d.id
                 WHERE d.mime_type = ?1 AND s.attachment_id IS NULL
                   AND COALESCE(m.status, 'pending') != 'failed'
                 ORDER BY d.id ASC
                 LIMIT 1",
                params![PDF_MIME_TYPE],
                |r| r.get(0),
            )
            .optional()?;
        Ok(id)
    })
}

/// Counts PDF documents that have an index row.
pub fn count_indexed(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM search_index s
             JOIN documents d ON d.id = s.attachment_id
             WHERE d.mime_type = ?1",
            params![PDF_MIME_TYPE],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Deletes every index row. Returns the number of rows removed.
pub fn truncate(db: &Database) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| Ok(conn.execute("DELETE FROM search_index", [])?))
}

/// Case-insensitive substring search over document titles and indexed text.
pub fn search(db: &Database, needle: &str, limit: u64) -> Result<Vec<SearchRow>, DatabaseError> {
    let pattern = format!("%{}%", escape_like(needle));
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT d.id, d.title, COALESCE(s.content, '') AS content
             FROM documents d
             LEFT JOIN search_index s ON s.attachment_id = d.id
             WHERE d.title LIKE ?1 ESCAPE '\\' OR s.content LIKE ?1 ESCAPE '\\'
             ORDER BY d.id ASC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![pattern, limit as i64], |row| {
                Ok(SearchRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::document_repo;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn add_pdf(db: &Database, name: &str) -> i64 {
        document_repo::insert(
            db,
            name,
            &format!("/tmp/{}.pdf", name),
            PDF_MIME_TYPE,
            "2026-01-01T00:00:00Z",
        )
        .unwrap()
    }

    #[test]
    fn test_upsert_overwrites() {
        let db = test_db();
        let id = add_pdf(&db, "a");

        upsert(&db, id, "first", "t1").unwrap();
        upsert(&db, id, "second", "t2").unwrap();

        assert_eq!(find_content(&db, id).unwrap().as_deref(), Some("second"));
        assert_eq!(count_indexed(&db).unwrap(), 1);
    }

    #[test]
    fn test_next_unindexed_is_lowest_id() {
        let db = test_db();
        let a = add_pdf(&db, "a");
        let b = add_pdf(&db, "b");
        let c = add_pdf(&db, "c");

        assert_eq!(next_unindexed_id(&db).unwrap(), Some(a));
        // Repeated calls without writes select the same document.
        assert_eq!(next_unindexed_id(&db).unwrap(), Some(a));

        upsert(&db, a, "text", "t").unwrap();
        assert_eq!(next_unindexed_id(&db).unwrap(), Some(b));

        upsert(&db, c, "text", "t").unwrap();
        upsert(&db, b, "text", "t").unwrap();
        assert_eq!(next_unindexed_id(&db).unwrap(), None);
    }

    #[test]
    fn test_next_unindexed_skips_failed_without_content() {
        let db = test_db();
        let a = add_pdf(&db, "a");
        let b = add_pdf(&db, "b");

        document_repo::upsert_status(&db, a, "failed", None, "t").unwrap();
        assert_eq!(next_unindexed_id(&db).unwrap(), Some(b));

        document_repo::upsert_status(&db, a, "pending", None, "t").unwrap();
        assert_eq!(next_unindexed_id(&db).unwrap(), Some(a));
    }

    #[test]
    fn test_next_unindexed_skips_non_pdf() {
        let db = test_db();
        document_repo::insert(&db, "notes", "/tmp/notes.txt", "text/plain", "t").unwrap();
        assert_eq!(next_unindexed_id(&db).unwrap(), None);
    }

    #[test]
    fn test_delete_and_truncate() {
        let db = test_db();
        let a = add_pdf(&db, "a");
        let b = add_pdf(&db, "b");
        upsert(&db, a, "x", "t").unwrap();
        upsert(&db, b, "y", "t").unwrap();

        assert!(delete(&db, a).unwrap());
        assert!(!delete(&db, a).unwrap());
        assert_eq!(count_indexed(&db).unwrap(), 1);

        assert_eq!(truncate(&db).unwrap(), 1);
        assert_eq!(count_indexed(&db).unwrap(), 0);
    }

    #[test]
    fn test_search_matches_title_or_content() {
        let db = test_db();
        let report = add_pdf(&db, "Annual Report");
        let memo = add_pdf(&db, "memo");
        upsert(&db, memo, "Quarterly revenue grew", "t").unwrap();

        let by_title = search(&db, "annual", 10).unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].id, report);

        let by_content = search(&db, "REVENUE", 10).unwrap();
        assert_eq!(by_content.len(), 1);
        assert_eq!(by_content[0].id, memo);
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let db = test_db();
        let id = add_pdf(&db, "plain");
        upsert(&db, id, "nothing special", "t").unwrap();

        assert!(search(&db, "%", 10).unwrap().is_empty());
        assert!(search(&db, "_", 10).unwrap().is_empty());
    }
}
