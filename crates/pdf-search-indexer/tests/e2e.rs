//! End-to-end tests that drain the batch queue over real PDF files.
//!
//! Each case writes one generated fixture, registers it, drains the queue
//! and checks the terminal status and stored text.

mod common;

use common::{corrupt_pdf, encrypted_pdf, PdfBuilder, TestHarness};
use pdf_search_indexer::indexer::{ErrorKind, LogStatus};
use pdf_search_indexer::{load_config_from_str, DocumentStatus, IndexerConfig};

const MB: usize = 1024 * 1024;

/// Size limits small enough to cross with padded fixtures.
fn small_limits() -> IndexerConfig {
    load_config_from_str(
        r#"{
            "version": "1.0",
            "indexing": { "max_size_mb": 1, "hard_limit_mb": 2, "limited_page_cap": 1 }
        }"#,
    )
    .unwrap()
}

struct TestCase {
    name: &'static str,
    file: &'static str,
    bytes: fn() -> Vec<u8>,
    expected_status: DocumentStatus,
    /// Substrings the stored text must contain.
    expected_text: &'static [&'static str],
    /// Entry expected at the head of the error ring, if any.
    expected_error: Option<ErrorKind>,
}

const TEST_CASES: &[TestCase] = &[
    TestCase {
        name: "plain_pdf",
        file: "plain.pdf",
        bytes: || PdfBuilder::new().page("Quarterly summary").build(),
        expected_status: DocumentStatus::Completed,
        expected_text: &[],
        expected_error: None,
    },
    TestCase {
        name: "limited_large_pdf",
        file: "archive.pdf",
        bytes: || {
            PdfBuilder::new()
                .page("First page")
                .page("Second page")
                .title("Annual Archive")
                .author("Records Office")
                .padding(MB + MB / 4)
                .build()
        },
        expected_status: DocumentStatus::Completed,
        expected_text: &[
            "Large PDF file indexed with limited content",
            "Title: Annual Archive",
            "Author: Records Office",
            "[Note: Only first 1 pages were indexed due to file size]",
        ],
        expected_error: None,
    },
    TestCase {
        name: "oversized_pdf",
        file: "huge.pdf",
        bytes: || PdfBuilder::new().page("Too big").padding(2 * MB + MB / 2).build(),
        expected_status: DocumentStatus::Completed,
        expected_text: &["Very large PDF file: huge.pdf", "not indexed due to its extreme size"],
        expected_error: Some(ErrorKind::Oversized),
    },
    TestCase {
        name: "encrypted_pdf",
        file: "locked.pdf",
        bytes: encrypted_pdf,
        expected_status: DocumentStatus::Secured,
        expected_text: &["password-protected or secured", "Filename: locked.pdf"],
        expected_error: Some(ErrorKind::Secured),
    },
    TestCase {
        name: "corrupt_pdf_gives_up",
        file: "broken.pdf",
        bytes: corrupt_pdf,
        expected_status: DocumentStatus::Failed,
        expected_text: &["[ERROR] Indexing failed after 3 attempts", "Filename: broken.pdf"],
        expected_error: Some(ErrorKind::ParseError),
    },
];

#[test]
fn test_drain_cases() {
    for case in TEST_CASES {
        let h = TestHarness::with_config(small_limits());
        let id = h.add(case.file, &(case.bytes)());

        h.drain();

        let status = h.indexer.catalog().status(id).unwrap();
        assert_eq!(
            status, case.expected_status,
            "Test '{}': unexpected status",
            case.name
        );

        let content = h
            .indexer
            .store()
            .content(id)
            .unwrap()
            .unwrap_or_else(|| panic!("Test '{}': no stored text", case.name));
        for expected in case.expected_text {
            assert!(
                content.contains(expected),
                "Test '{}': expected text containing '{}', got '{}'",
                case.name,
                expected,
                content
            );
        }

        let progress = h.indexer.status().unwrap().progress;
        match case.expected_error {
            Some(kind) => {
                assert_eq!(
                    progress.errors.first().map(|e| e.kind),
                    Some(kind),
                    "Test '{}': unexpected error ring head",
                    case.name
                );
                assert_eq!(progress.errors[0].file, case.file);
            }
            None => assert!(
                progress.errors.is_empty(),
                "Test '{}': unexpected errors {:?}",
                case.name,
                progress.errors
            ),
        }
    }
}

#[test]
fn test_mixed_directory_drains_to_full_coverage() {
    let h = TestHarness::new();
    h.write("a/one.pdf", &PdfBuilder::new().page("One").build());
    h.write("a/two.pdf", &PdfBuilder::new().page("Two").build());
    h.write("b/locked.pdf", &encrypted_pdf());
    h.write("b/readme.txt", b"not a pdf");

    let report = h.indexer.scan(&h.docs_dir).unwrap();
    assert_eq!(report.registered.len(), 3);

    let batches = h.drain();
    assert_eq!(batches, 3);

    let status = h.indexer.status().unwrap();
    assert_eq!(status.total_documents, 3);
    assert_eq!(status.indexed_documents, 3);
    assert_eq!(status.secured_documents, 1);
    assert_eq!(status.pending_documents, 0);
    assert_eq!(status.percentage, 100.0);
    assert_eq!(status.process_status, "Inactive");

    // Drain resets the run but keeps the log window.
    assert_eq!(status.progress.batch_number, 0);
    assert!(status.progress.current_file.is_empty());
    assert_eq!(status.progress.log.len(), 3);
    assert!(status
        .progress
        .log
        .iter()
        .any(|entry| entry.status == LogStatus::Secured));
}

#[test]
fn test_corrupt_document_backs_off_between_attempts() {
    let h = TestHarness::new();
    h.add("good.pdf", &PdfBuilder::new().page("Fine").build());
    let bad = h.add("zz-broken.pdf", &corrupt_pdf());
    // Ids are assigned in registration order, so the good file goes first.
    assert!(bad > 1);

    let mut delays = Vec::new();
    loop {
        match h.indexer.run_batch() {
            pdf_search_indexer::BatchOutcome::Continue { delay } => {
                delays.push(delay.as_secs());
                h.clock.advance(delay);
            }
            pdf_search_indexer::BatchOutcome::Drained => break,
            other => panic!("Unexpected batch outcome: {:?}", other),
        }
    }

    // good.pdf, then two failed attempts; the third attempt gives up and drains.
    assert_eq!(delays, vec![60, 60, 120]);
    assert_eq!(h.indexer.catalog().status(bad).unwrap(), DocumentStatus::Failed);
    assert_eq!(h.indexer.catalog().failed_count(bad).unwrap(), 3);

    // The terminal failure still counts as a consecutive error.
    assert_eq!(h.indexer.status().unwrap().progress.consecutive_errors, 3);
}

#[test]
fn test_reindex_after_drain_indexes_again() {
    let h = TestHarness::new();
    let id = h.add("again.pdf", &PdfBuilder::new().page("Again").build());
    h.drain();
    assert!(h.indexer.store().content(id).unwrap().is_some());

    h.indexer.reindex_all().unwrap();
    assert!(h.indexer.store().content(id).unwrap().is_none());
    assert_eq!(h.indexer.catalog().status(id).unwrap(), DocumentStatus::Pending);

    let outcome = h.indexer.run_due().unwrap();
    assert_eq!(outcome, Some(pdf_search_indexer::BatchOutcome::Drained));
    assert_eq!(h.indexer.catalog().status(id).unwrap(), DocumentStatus::Completed);
}

#[test]
fn test_search_finds_limited_metadata() {
    let h = TestHarness::with_config(small_limits());
    let id = h.add(
        "archive.pdf",
        &PdfBuilder::new()
            .page("Body")
            .title("Harbour Survey")
            .author("Port Authority")
            .padding(MB + MB / 4)
            .build(),
    );
    h.drain();

    let hits = h.indexer.search("Harbour Survey", 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, id);
    assert!(hits[0].snippet.contains("Harbour Survey"));

    assert!(h.indexer.search("no such phrase", 10).unwrap().is_empty());
}
