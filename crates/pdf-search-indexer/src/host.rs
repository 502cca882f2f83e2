//! In-process host driver.
//!
//! Plays the role of the external scheduler: delivers due batch
//! invocations from the task queue, runs the watchdog on its own fixed
//! interval, and accepts manual "run now" commands.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use crate::indexer::{BatchOutcome, Indexer};

/// Manual commands accepted by a running host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    RunBatch,
    RunWatchdog,
}

pub struct HostScheduler {
    indexer: Arc<Indexer>,
    poll_interval: Duration,
    watchdog_interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl HostScheduler {
    /// `poll_interval` is how often the task queue is checked for due work.
    pub fn new(indexer: Arc<Indexer>, poll_interval: Duration) -> Self {
        let watchdog_interval = indexer.config().watchdog.interval();
        Self {
            indexer,
            poll_interval,
            watchdog_interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval;
        self
    }

    /// Starts the host loop in a background thread.
    pub fn start(&self, mut trigger_rx: broadcast::Receiver<HostCommand>) -> JoinHandle<()> {
        let indexer = Arc::clone(&self.indexer);
        let shutdown = Arc::clone(&self.shutdown);
        let poll_interval = self.poll_interval;
        let watchdog_interval = self.watchdog_interval;

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    log::error!("Failed to build host runtime: {}", e);
                    return;
                }
            };

            rt.block_on(async {
                let mut poll_timer = tokio::time::interval(poll_interval);
                poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                let mut watchdog_timer = tokio::time::interval(watchdog_interval);
                watchdog_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                watchdog_timer.tick().await; // skip immediate first tick

                log::info!(
                    "Host started (poll every {:?}, watchdog every {:?})",
                    poll_interval,
                    watchdog_interval
                );

                loop {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    tokio::select! {
                        _ = poll_timer.tick() => deliver_due(&indexer),
                        _ = watchdog_timer.tick() => run_watchdog(&indexer),
                        Ok(command) = trigger_rx.recv() => {
                            if shutdown.load(Ordering::Acquire) {
                                break;
                            }
                            log::info!("Manual {:?} triggered", command);
                            match command {
                                HostCommand::RunBatch => log_outcome(&indexer.run_batch()),
                                HostCommand::RunWatchdog => run_watchdog(&indexer),
                            }
                        },
                    }
                }

                log::info!("Host stopped");
            });
        })
    }

    /// Signals the host loop to stop.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

fn deliver_due(indexer: &Indexer) {
    match indexer.run_due() {
        Ok(Some(outcome)) => log_outcome(&outcome),
        Ok(None) => {}
        Err(e) => log::error!("Failed to read the task queue: {}", e),
    }
}

fn run_watchdog(indexer: &Indexer) {
    match indexer.run_watchdog() {
        Ok(outcome) => log::debug!("Watchdog: {:?}", outcome),
        Err(e) => log::error!("Watchdog check failed: {}", e),
    }
}

fn log_outcome(outcome: &BatchOutcome) {
    match outcome {
        BatchOutcome::Continue { delay } => {
            log::debug!("Batch done, next in {}s", delay.as_secs())
        }
        BatchOutcome::Drained => log::info!("Batch queue drained"),
        BatchOutcome::Aborted(reason) => log::warn!("Batch aborted: {:?}", reason),
        BatchOutcome::Busy => log::debug!("Batch skipped, lock held"),
    }
}
