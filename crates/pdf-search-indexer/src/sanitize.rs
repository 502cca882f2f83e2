//! Helpers for sanitizing data before it enters log lines, span attributes
//! and the progress record.
//!
//! Document paths are reduced to their file name so logs and the status
//! snapshot never expose the storage layout.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}
