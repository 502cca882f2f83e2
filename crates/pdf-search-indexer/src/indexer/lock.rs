//! Expiring mutual-exclusion lock around batch and watchdog runs.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::db::{lock_repo, Database, DatabaseError};

/// Name of the lock shared by the batch runner and the watchdog.
pub const BATCH_LOCK: &str = "pdf_search_indexer_batch";

/// Hands out [`LockGuard`]s for one named lock.
#[derive(Clone)]
pub struct LockManager {
    db: Database,
    clock: Arc<dyn Clock>,
    name: &'static str,
    ttl: Duration,
}

impl LockManager {
    pub fn new(db: Database, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            db,
            clock,
            name: BATCH_LOCK,
            ttl,
        }
    }

    /// Takes the lock, or returns `None` while someone else holds it.
    ///
    /// The lock expires after the TTL even if its holder never releases it.
    pub fn try_acquire(&self) -> Result<Option<LockGuard>, DatabaseError> {
        let token = uuid::Uuid::new_v4().to_string();
        let now = self.clock.now_millis();
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);

        if lock_repo::try_acquire(&self.db, self.name, &token, now, now.saturating_add(ttl_ms))? {
            Ok(Some(LockGuard {
                db: self.db.clone(),
                name: self.name,
                token,
                released: false,
            }))
        } else {
            Ok(None)
        }
    }

    pub fn is_held(&self) -> Result<bool, DatabaseError> {
        lock_repo::is_held(&self.db, self.name, self.clock.now_millis())
    }
}

/// A held lock. Released explicitly or on drop.
pub struct LockGuard {
    db: Database,
    name: &'static str,
    token: String,
    released: bool,
}

impl LockGuard {
    /// Releases the lock. Returns false if it had already expired and been
    /// taken over.
    pub fn release(mut self) -> Result<bool, DatabaseError> {
        self.released = true;
        lock_repo::release(&self.db, self.name, &self.token)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = lock_repo::release(&self.db, self.name, &self.token) {
            log::warn!("Failed to release lock '{}': {}", self.name, e);
        }
    }
}
