//! Document store: the search index table plus its read-through cache.

use std::sync::Arc;

use serde::Serialize;

use crate::clock::Clock;
use crate::db::{document_repo, index_repo, Database, DatabaseError};
use crate::indexer::cache::{CacheKey, ReadThroughCache};

/// Characters of context shown around a search match.
const SNIPPET_RADIUS: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: i64,
    pub title: String,
    pub snippet: String,
}

/// Stores extracted text by document id. Every write invalidates the cache.
pub struct DocumentStore {
    db: Database,
    cache: ReadThroughCache,
    clock: Arc<dyn Clock>,
}

impl DocumentStore {
    pub fn new(db: Database, cache: ReadThroughCache, clock: Arc<dyn Clock>) -> Self {
        Self { db, cache, clock }
    }

    /// Writes `content` as the indexed text of `id`, replacing any previous row.
    pub fn upsert(&self, id: i64, content: &str) -> Result<(), DatabaseError> {
        let result = index_repo::upsert(&self.db, id, content, &self.clock.now().to_rfc3339());
        self.cache.invalidate();
        result
    }

    /// Removes the indexed text of `id` so it is picked up again.
    pub fn remove(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = index_repo::delete(&self.db, id);
        self.cache.invalidate();
        result
    }

    /// Empties the store.
    pub fn truncate(&self) -> Result<usize, DatabaseError> {
        let result = index_repo::truncate(&self.db);
        self.cache.invalidate();
        result
    }

    /// Drops cached lookups after changes made outside the store.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// Lowest id of a catalog PDF with no indexed text.
    pub fn next_unindexed_id(&self) -> Result<Option<i64>, DatabaseError> {
        self.cache
            .id(CacheKey::NextUnindexed, || index_repo::next_unindexed_id(&self.db))
    }

    pub fn count_total(&self) -> Result<u64, DatabaseError> {
        self.cache
            .count(CacheKey::TotalDocuments, || document_repo::count_pdfs(&self.db))
    }

    pub fn count_indexed(&self) -> Result<u64, DatabaseError> {
        self.cache
            .count(CacheKey::IndexedDocuments, || index_repo::count_indexed(&self.db))
    }

    pub fn content(&self, id: i64) -> Result<Option<String>, DatabaseError> {
        index_repo::find_content(&self.db, id)
    }

    /// Case-insensitive substring search over titles and indexed text.
    pub fn search(&self, query: &str, limit: u64) -> Result<Vec<SearchHit>, DatabaseError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let rows = index_repo::search(&self.db, query, limit)?;
        Ok(rows
            .into_iter()
            .map(|row| SearchHit {
                snippet: snippet(&row.content, query),
                id: row.id,
                title: row.title,
            })
            .collect())
    }
}

/// Cuts a window of text around the first match, or the head of the text
/// when only the title matched.
fn snippet(content: &str, query: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let lowered: Vec<char> = content.chars().flat_map(char::to_lowercase).collect();
    let needle: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();

    // Lowercasing can change the length of some characters; fall back to
    // the head of the text when the positions no longer line up.
    let position = if lowered.len() == chars.len() {
        lowered
            .windows(needle.len().max(1))
            .position(|w| w == needle.as_slice())
    } else {
        None
    };

    let (start, end) = match position {
        Some(pos) => (
            pos.saturating_sub(SNIPPET_RADIUS),
            (pos + needle.len() + SNIPPET_RADIUS).min(chars.len()),
        ),
        None => (0, (SNIPPET_RADIUS * 2).min(chars.len())),
    };

    let mut out: String = chars[start..end].iter().collect();
    out = out.split_whitespace().collect::<Vec<_>>().join(" ");
    if start > 0 {
        out.insert_str(0, "...");
    }
    if end < chars.len() {
        out.push_str("...");
    }
    out
}
