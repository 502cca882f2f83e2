//! Out-of-band stall detection.
//!
//! The batch chain re-arms itself through the task queue; if the host drops
//! a delivery the chain silently stops. The watchdog notices a stale
//! heartbeat with nothing pending and restarts it.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::IndexerConfig;
use crate::error::IndexerError;
use crate::indexer::lock::LockManager;
use crate::indexer::progress::{LogEntry, LogStatus, ProgressStore};
use crate::indexer::store::DocumentStore;
use crate::queue::{TaskQueue, INDEX_BATCH_TASK};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogOutcome {
    /// No heartbeat: nothing has been running.
    Idle,
    /// Heartbeat is recent or a batch is pending.
    Healthy,
    /// A batch holds the lock right now.
    InFlight,
    /// Stalled with work left; a batch was scheduled.
    Restarted,
    /// Stalled with no work left; the heartbeat was cleared.
    Cleared,
}

pub struct Watchdog {
    store: Arc<DocumentStore>,
    progress: Arc<dyn ProgressStore>,
    queue: Arc<dyn TaskQueue>,
    locks: LockManager,
    clock: Arc<dyn Clock>,
    config: IndexerConfig,
}

impl Watchdog {
    pub fn new(
        store: Arc<DocumentStore>,
        progress: Arc<dyn ProgressStore>,
        queue: Arc<dyn TaskQueue>,
        locks: LockManager,
        clock: Arc<dyn Clock>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            store,
            progress,
            queue,
            locks,
            clock,
            config,
        }
    }

    pub fn check(&self) -> Result<WatchdogOutcome, IndexerError> {
        let span = tracing::info_span!("watchdog");
        let _enter = span.enter();

        let Some(lock) = self.locks.try_acquire()? else {
            log::debug!("Batch in flight, skipping stall check");
            return Ok(WatchdogOutcome::InFlight);
        };

        let outcome = self.inspect();

        if let Err(e) = lock.release() {
            log::warn!("Failed to release the batch lock: {}", e);
        }

        outcome
    }

    fn inspect(&self) -> Result<WatchdogOutcome, IndexerError> {
        let mut progress = self.progress.get()?;
        let now = self.clock.now();

        let Some(age) = progress.heartbeat_age(now) else {
            return Ok(WatchdogOutcome::Idle);
        };

        let threshold = self.config.watchdog.stall_threshold();
        let stale = age
            .to_std()
            .map(|age| age > threshold)
            .unwrap_or(false);
        if !stale || self.queue.is_scheduled(INDEX_BATCH_TASK)? {
            return Ok(WatchdogOutcome::Healthy);
        }

        log::warn!(
            "Indexing stalled: last heartbeat {}s ago and no batch pending",
            age.num_seconds()
        );
        self.queue.clear(INDEX_BATCH_TASK)?;

        self.store.invalidate();
        if self.store.next_unindexed_id()?.is_some() {
            let delay = self.config.batch.restart_delay();
            self.queue.schedule(INDEX_BATCH_TASK, delay)?;
            progress.push_log(
                LogEntry {
                    file: progress.current_file.clone(),
                    status: LogStatus::RestartedByWatchdog,
                    timestamp: now,
                },
                self.config.progress.log_capacity,
            );
            progress.last_update = Some(now);
            self.progress.set(&progress)?;
            log::info!("Restarted indexing, next batch in {}s", delay.as_secs());
            Ok(WatchdogOutcome::Restarted)
        } else {
            progress.heartbeat = None;
            progress.last_update = Some(now);
            self.progress.set(&progress)?;
            log::info!("No unindexed documents left, cleared heartbeat");
            Ok(WatchdogOutcome::Cleared)
        }
    }
}
