use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    pub version: String,
    /// Overrides the default database location.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: None,
            indexing: IndexingConfig::default(),
            batch: BatchConfig::default(),
            watchdog: WatchdogConfig::default(),
            progress: ProgressConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
    #[serde(default = "default_hard_limit_mb")]
    pub hard_limit_mb: u64,
    #[serde(default = "default_limited_page_cap")]
    pub limited_page_cap: usize,
    #[serde(default = "default_parse_timeout_secs")]
    pub parse_timeout_secs: u64,
}

fn default_max_size_mb() -> u64 {
    20
}

fn default_hard_limit_mb() -> u64 {
    50
}

fn default_limited_page_cap() -> usize {
    3
}

fn default_parse_timeout_secs() -> u64 {
    240
}

impl IndexingConfig {
    /// Soft ceiling in bytes; larger files get limited extraction.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb * MB
    }

    /// Hard ceiling in bytes; larger files are never parsed.
    pub fn hard_limit_bytes(&self) -> u64 {
        self.hard_limit_mb * MB
    }

    pub fn parse_timeout(&self) -> Duration {
        Duration::from_secs(self.parse_timeout_secs)
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_mb: default_max_size_mb(),
            hard_limit_mb: default_hard_limit_mb(),
            limited_page_cap: default_limited_page_cap(),
            parse_timeout_secs: default_parse_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
    #[serde(default = "default_max_document_failures")]
    pub max_document_failures: u32,
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,
    #[serde(default = "default_restart_delay_secs")]
    pub restart_delay_secs: u64,
}

fn default_base_delay_secs() -> u64 {
    60
}

fn default_max_delay_secs() -> u64 {
    300
}

fn default_max_consecutive_errors() -> u32 {
    5
}

fn default_max_document_failures() -> u32 {
    3
}

fn default_lock_ttl_secs() -> u64 {
    120
}

fn default_restart_delay_secs() -> u64 {
    10
}

impl BatchConfig {
    /// Delay before the next batch after `consecutive_errors` error batches.
    ///
    /// `min(max_delay, base_delay * max(1, consecutive_errors))`
    pub fn backoff_delay(&self, consecutive_errors: u32) -> Duration {
        let factor = u64::from(consecutive_errors.max(1));
        let secs = self
            .base_delay_secs
            .saturating_mul(factor)
            .min(self.max_delay_secs);
        Duration::from_secs(secs)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            max_consecutive_errors: default_max_consecutive_errors(),
            max_document_failures: default_max_document_failures(),
            lock_ttl_secs: default_lock_ttl_secs(),
            restart_delay_secs: default_restart_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    #[serde(default = "default_watchdog_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_stall_threshold_secs")]
    pub stall_threshold_secs: u64,
}

fn default_watchdog_interval_secs() -> u64 {
    300
}

fn default_stall_threshold_secs() -> u64 {
    180
}

impl WatchdogConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn stall_threshold(&self) -> Duration {
        Duration::from_secs(self.stall_threshold_secs)
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_watchdog_interval_secs(),
            stall_threshold_secs: default_stall_threshold_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

fn default_log_capacity() -> usize {
    50
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Zero disables caching.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    30
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}
