use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};

use crate::error::ExtractError;
use crate::extract::placeholder;
use crate::extract::{ExtractOutcome, TextExtractor, TextResult};
use crate::sanitize::redact_path;

/// Bounds another extractor by wall-clock time.
///
/// The extraction runs on its own thread. On breach the caller gets a
/// parse error and the worker is left to finish in the background.
pub struct TimeLimitedExtractor {
    inner: Arc<dyn TextExtractor>,
    timeout: Duration,
}

impl TimeLimitedExtractor {
    pub fn new(inner: Arc<dyn TextExtractor>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl TextExtractor for TimeLimitedExtractor {
    fn extract(&self, path: &Path, max_normal_size: u64) -> TextResult {
        let (tx, rx) = bounded(1);
        let inner = Arc::clone(&self.inner);
        let owned_path = path.to_path_buf();

        let spawned = std::thread::Builder::new()
            .name("pdf-extract".to_string())
            .spawn(move || {
                let result = inner.extract(&owned_path, max_normal_size);
                let _ = tx.send(result);
            });

        if let Err(e) = spawned {
            let message = format!("Failed to spawn extraction thread: {}", e);
            return TextResult::new(
                placeholder::parse_error(&message),
                ExtractOutcome::ParseError { message },
            );
        }

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Extraction of {} exceeded {:?}, abandoning",
                    redact_path(path),
                    self.timeout
                );
                let message = ExtractError::Timeout {
                    secs: self.timeout.as_secs(),
                }
                .to_string();
                TextResult::new(
                    placeholder::parse_error(&message),
                    ExtractOutcome::ParseError { message },
                )
            }
            Err(RecvTimeoutError::Disconnected) => {
                let message = "Extraction thread terminated unexpectedly".to_string();
                TextResult::new(
                    placeholder::parse_error(&message),
                    ExtractOutcome::ParseError { message },
                )
            }
        }
    }
}
