//! Schema versioning for the indexer database.
//!
//! Applied versions are recorded in `_migrations`; anything newer runs in
//! ascending order on open. Scripts use `IF NOT EXISTS` and may be re-run.

use rusqlite::Connection;

use super::error::DatabaseError;

/// One schema step.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// Catalog and index tables first, then the pipeline state tables.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_documents_table",
        sql: include_str!("sql/001_create_documents.sql"),
    },
    Migration {
        version: 2,
        description: "create_search_index_table",
        sql: include_str!("sql/002_create_search_index.sql"),
    },
    Migration {
        version: 3,
        description: "create_document_meta_table",
        sql: include_str!("sql/003_create_document_meta.sql"),
    },
    Migration {
        version: 4,
        description: "create_options_table",
        sql: include_str!("sql/004_create_options.sql"),
    },
    Migration {
        version: 5,
        description: "create_locks_table",
        sql: include_str!("sql/005_create_locks.sql"),
    },
    Migration {
        version: 6,
        description: "create_scheduled_tasks_table",
        sql: include_str!("sql/006_create_scheduled_tasks.sql"),
    },
];

/// Brings `conn` up to the latest schema version.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        log::info!(
            "Applying schema v{} ({})",
            migration.version,
            migration.description
        );

        conn.execute_batch(migration.sql)
            .map_err(|e| DatabaseError::Migration {
                version: migration.version,
                reason: e.to_string(),
            })?;

        conn.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.description],
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, table: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |r| r.get::<_, u32>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn test_migrations_run_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();

        let count: u32 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as u32);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();
        run_all(&conn).unwrap();

        let count: u32 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as u32);
    }

    #[test]
    fn test_all_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();

        for table in [
            "documents",
            "search_index",
            "document_meta",
            "options",
            "locks",
            "scheduled_tasks",
        ] {
            assert!(table_exists(&conn, table), "missing table {}", table);
        }
    }

    #[test]
    fn test_search_index_rejects_duplicate_ids() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();

        conn.execute(
            "INSERT INTO search_index (attachment_id, content, indexed_at) VALUES (1, 'a', 'now')",
            [],
        )
        .unwrap();
        let duplicate = conn.execute(
            "INSERT INTO search_index (attachment_id, content, indexed_at) VALUES (1, 'b', 'now')",
            [],
        );
        assert!(duplicate.is_err());
    }
}
