//! Extraction adapter: file path in, searchable text out.
//!
//! Every outcome carries content. Failures come back as placeholder text
//! naming the file and the reason, so the document store always receives
//! something searchable.

pub mod pdf;
pub mod placeholder;
pub mod timeout;

use std::path::Path;

pub use pdf::LopdfExtractor;
pub use timeout::TimeLimitedExtractor;

/// How an extraction ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Full text of every page.
    Full,
    /// Above the soft ceiling: metadata plus the first pages only.
    Limited { pages_indexed: usize },
    /// Above the soft ceiling and the constrained parse failed; content
    /// only names the file.
    Partial { message: String },
    /// Above the hard ceiling; no parse was attempted.
    Oversized { size_bytes: u64 },
    /// Encrypted or password-protected.
    Secured,
    /// Any other failure. Retried on later passes.
    ParseError { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResult {
    pub content: String,
    pub outcome: ExtractOutcome,
}

impl TextResult {
    pub fn new(content: impl Into<String>, outcome: ExtractOutcome) -> Self {
        Self {
            content: content.into(),
            outcome,
        }
    }

    pub fn is_secured(&self) -> bool {
        matches!(self.outcome, ExtractOutcome::Secured)
    }

    /// Whether the content should not be stored as the document's text.
    #[cfg(test)]
    pub(crate) fn is_failure(&self) -> bool {
        matches!(self.outcome, ExtractOutcome::ParseError { .. })
    }
}

/// Turns a document into searchable text.
///
/// The caller checks that `path` exists. Files larger than
/// `max_normal_size` bytes get a constrained extraction.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path, max_normal_size: u64) -> TextResult;
}
