use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::catalog::{Catalog, PDF_MIME_TYPE};
use crate::error::CatalogError;
use crate::sanitize::redact_path;

/// Result of one directory scan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Ids of newly registered documents, in discovery order.
    pub registered: Vec<i64>,
    /// PDFs already present in the catalog.
    pub skipped: usize,
}

/// Registers PDFs found under a directory tree.
pub struct DocumentScanner {
    root: PathBuf,
}

impl DocumentScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks the tree and registers every PDF not yet in the catalog.
    /// Titles default to the file stem.
    pub fn scan(&self, catalog: &Catalog) -> Result<ScanReport, CatalogError> {
        let mut report = ScanReport::default();

        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| CatalogError::ScanFailed {
                path: self.root.clone(),
                source: e,
            })?;
            if entry.file_type().is_file() && is_pdf(entry.path()) {
                entries.push(entry.into_path());
            }
        }

        for path in entries {
            if catalog.find_by_path(&path)?.is_some() {
                report.skipped += 1;
                continue;
            }

            let title = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("untitled")
                .to_string();
            let id = catalog.register(&title, &path, PDF_MIME_TYPE)?;
            log::debug!("Found document: {}", redact_path(&path));
            report.registered.push(id);
        }

        log::info!(
            "Scanned {}: {} registered, {} already known",
            redact_path(&self.root),
            report.registered.len(),
            report.skipped
        );

        Ok(report)
    }
}

/// Detects PDFs by the MIME type guessed from the file name.
pub fn is_pdf(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str() == PDF_MIME_TYPE)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::db::Database;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn catalog() -> Catalog {
        Catalog::new(Database::open_in_memory().unwrap(), Arc::new(SystemClock))
    }

    #[test]
    fn test_scan_registers_pdfs_recursively() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("2024")).unwrap();
        std::fs::write(dir.path().join("b-report.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("2024").join("a-minutes.PDF"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"plain").unwrap();

        let catalog = catalog();
        let report = DocumentScanner::new(dir.path()).scan(&catalog).unwrap();

        assert_eq!(report.registered.len(), 2);
        assert_eq!(report.skipped, 0);
        let titles: Vec<String> = catalog
            .list(10)
            .unwrap()
            .into_iter()
            .map(|d| d.title)
            .collect();
        assert!(titles.contains(&"b-report".to_string()));
        assert!(titles.contains(&"a-minutes".to_string()));
    }

    #[test]
    fn test_rescan_skips_known_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("one.pdf"), b"%PDF-1.4").unwrap();

        let catalog = catalog();
        let scanner = DocumentScanner::new(dir.path());
        scanner.scan(&catalog).unwrap();
        let report = scanner.scan(&catalog).unwrap();

        assert!(report.registered.is_empty());
        assert_eq!(report.skipped, 1);
        assert_eq!(catalog.count_pdfs().unwrap(), 1);
    }

    #[test]
    fn test_scan_missing_directory_fails() {
        let catalog = catalog();
        let result = DocumentScanner::new("/nonexistent/uploads").scan(&catalog);
        assert!(matches!(result, Err(CatalogError::ScanFailed { .. })));
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(Path::new("/a/b.pdf")));
        assert!(is_pdf(Path::new("/a/B.PDF")));
        assert!(!is_pdf(Path::new("/a/b.docx")));
        assert!(!is_pdf(Path::new("/a/noext")));
    }
}
