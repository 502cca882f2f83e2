//! Placeholder texts written in place of extracted content.
//!
//! The secured marker phrase is also what the status counters look for.

pub const SECURED_MARKER: &str = "password-protected or secured";

pub const MISSING_FILE: &str = "[ERROR] File missing on disk";

pub fn size_mb(size_bytes: u64) -> String {
    format!("{:.2}", size_bytes as f64 / (1024.0 * 1024.0))
}

pub fn secured(filename: &str) -> String {
    format!(
        "This PDF is {} and cannot be indexed. Filename: {}",
        SECURED_MARKER, filename
    )
}

pub fn oversized(filename: &str, size_bytes: u64) -> String {
    format!(
        "Very large PDF file: {}\nSize: {}MB\nThis file was not indexed due to its extreme size.",
        filename,
        size_mb(size_bytes)
    )
}

pub fn partial(filename: &str, size_bytes: u64) -> String {
    format!(
        "Large PDF file: {}\nSize: {}MB\nThis file was partially indexed due to its size.",
        filename,
        size_mb(size_bytes)
    )
}

pub fn parse_error(message: &str) -> String {
    format!("Error processing PDF: {}", message)
}

/// Written when a document exhausts its retries.
pub fn gave_up(filename: &str, attempts: u32, message: &str) -> String {
    format!(
        "[ERROR] Indexing failed after {} attempts: {}\nFilename: {}",
        attempts, message, filename
    )
}
