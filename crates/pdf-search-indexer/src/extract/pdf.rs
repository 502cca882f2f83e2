use std::io::Read;
use std::path::Path;

use lopdf::Document;

use crate::error::ExtractError;
use crate::extract::placeholder;
use crate::extract::{ExtractOutcome, TextExtractor, TextResult};
use crate::sanitize::redact_path;

/// Bytes inspected by the encryption heuristic.
const HEADER_SCAN_BYTES: usize = 1024;

const METADATA_FIELDS: [&str; 4] = ["Title", "Subject", "Keywords", "Author"];

/// PDF text extraction backed by lopdf.
#[derive(Debug, Clone)]
pub struct LopdfExtractor {
    hard_limit_bytes: u64,
    page_cap: usize,
}

impl LopdfExtractor {
    pub fn new(hard_limit_bytes: u64, page_cap: usize) -> Self {
        Self {
            hard_limit_bytes,
            page_cap,
        }
    }
}

impl TextExtractor for LopdfExtractor {
    fn extract(&self, path: &Path, max_normal_size: u64) -> TextResult {
        let filename = redact_path(path);
        let _span = tracing::info_span!("extract", file = %filename).entered();

        let size_bytes = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                let err = ExtractError::ReadDocument {
                    path: path.to_path_buf(),
                    source: e,
                };
                return parse_failure(&err);
            }
        };

        if size_bytes > self.hard_limit_bytes {
            log::warn!(
                "Skipping {}: {} MB exceeds the hard limit",
                filename,
                placeholder::size_mb(size_bytes)
            );
            return TextResult::new(
                placeholder::oversized(&filename, size_bytes),
                ExtractOutcome::Oversized { size_bytes },
            );
        }

        match header_declares_encryption(path) {
            Ok(true) => {
                log::info!("Detected secured PDF: {}", filename);
                return secured(&filename);
            }
            Ok(false) => {}
            Err(e) => log::debug!("Header check failed for {}: {}", filename, e),
        }

        let limited = size_bytes > max_normal_size;
        if limited {
            log::info!(
                "Large file {} ({} MB), indexing metadata and first {} pages",
                filename,
                placeholder::size_mb(size_bytes),
                self.page_cap
            );
        }

        let doc = match load_document(path) {
            Ok(doc) => doc,
            Err(ExtractError::Secured) => return secured(&filename),
            Err(e) if limited => {
                log::warn!("Limited parse of {} failed: {}", filename, e);
                return TextResult::new(
                    placeholder::partial(&filename, size_bytes),
                    ExtractOutcome::Partial {
                        message: e.to_string(),
                    },
                );
            }
            Err(e) => return parse_failure(&e),
        };

        if limited {
            self.limited_text(&doc, size_bytes)
        } else {
            TextResult::new(full_text(&doc), ExtractOutcome::Full)
        }
    }
}

impl LopdfExtractor {
    fn limited_text(&self, doc: &Document, size_bytes: u64) -> TextResult {
        let mut text = format!(
            "Large PDF file indexed with limited content. Size: {}MB\n\n",
            placeholder::size_mb(size_bytes)
        );

        for (field, value) in metadata(doc) {
            text.push_str(&format!("{}: {}\n", field, value));
        }

        let mut pages_indexed = 0;
        for (page_num, _) in doc.get_pages().into_iter().take(self.page_cap) {
            if let Ok(page_text) = doc.extract_text(&[page_num]) {
                text.push_str(&page_text);
                text.push_str("\n\n");
            }
            pages_indexed += 1;
        }

        text.push_str(&format!(
            "\n[Note: Only first {} pages were indexed due to file size]",
            self.page_cap
        ));

        TextResult::new(text, ExtractOutcome::Limited { pages_indexed })
    }
}

fn secured(filename: &str) -> TextResult {
    TextResult::new(placeholder::secured(filename), ExtractOutcome::Secured)
}

fn parse_failure(err: &ExtractError) -> TextResult {
    let message = err.to_string();
    TextResult::new(
        placeholder::parse_error(&message),
        ExtractOutcome::ParseError { message },
    )
}

fn header_declares_encryption(path: &Path) -> std::io::Result<bool> {
    let mut header = Vec::with_capacity(HEADER_SCAN_BYTES);
    std::fs::File::open(path)?
        .take(HEADER_SCAN_BYTES as u64)
        .read_to_end(&mut header)?;
    Ok(header.windows(b"/Encrypt".len()).any(|w| w == b"/Encrypt"))
}

fn load_document(path: &Path) -> Result<Document, ExtractError> {
    let bytes = std::fs::read(path).map_err(|e| ExtractError::ReadDocument {
        path: path.to_path_buf(),
        source: e,
    })?;

    let doc = Document::load_mem(&bytes).map_err(|e| {
        let message = e.to_string();
        let lower = message.to_lowercase();
        if lower.contains("encrypt") || lower.contains("password") || lower.contains("decrypt") {
            ExtractError::Secured
        } else {
            ExtractError::Parse(message)
        }
    })?;

    if doc.is_encrypted() {
        return Err(ExtractError::Secured);
    }

    Ok(doc)
}

fn full_text(doc: &Document) -> String {
    let mut text = String::new();

    for (page_num, _) in doc.get_pages() {
        if let Ok(page_text) = doc.extract_text(&[page_num]) {
            text.push_str(&page_text);
            text.push('\n');
        }
    }

    text
}

/// Non-empty document info fields, in display order.
fn metadata(doc: &Document) -> Vec<(&'static str, String)> {
    let info = match doc
        .trailer
        .get(b"Info")
        .and_then(|obj| doc.dereference(obj))
        .and_then(|(_, obj)| obj.as_dict())
    {
        Ok(info) => info,
        Err(_) => return Vec::new(),
    };

    METADATA_FIELDS
        .iter()
        .filter_map(|field| {
            let raw = info.get(field.as_bytes()).ok()?.as_str().ok()?;
            let value = decode_pdf_string(raw);
            let value = value.trim();
            (!value.is_empty()).then(|| (*field, value.to_string()))
        })
        .collect()
}

/// Decodes a PDF text string: UTF-16BE with a byte order mark, otherwise
/// treated as single-byte.
fn decode_pdf_string(raw: &[u8]) -> String {
    if let Some(rest) = raw.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    raw.iter().map(|&b| b as char).collect()
}
