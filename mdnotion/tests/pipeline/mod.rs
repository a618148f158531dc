//! Sync pipeline tests against an in-memory page.

use crate::common::{write_doc, Call, FakeNotion};
use mdnotion::blocks::{plain_text, Block, ImageSource};
use mdnotion::hash::{self, METADATA_CAPTION};
use mdnotion::markdown::Converter;
use mdnotion::{
    HashOptions, HashStore, HashWriteOrder, MarkdownConverter, Pipeline, SyncError, SyncMode,
    SyncOptions, SyncState,
};
use std::path::Path;

const DOC: &str = "# Title\n\nHello ![alt](http://x/img.png?width=100)\n";

fn property_hash() -> Option<HashOptions> {
    Some(HashOptions::default())
}

fn run(options: &SyncOptions, document: &Path, notion: &FakeNotion) -> mdnotion::SyncReport {
    Pipeline::new(options, &MarkdownConverter, notion)
        .sync(document, "page-1", notion)
        .expect("sync should succeed")
}

#[test]
fn test_end_to_end_title_and_external_image() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", DOC);
    let options = SyncOptions::default();

    let prepared = Pipeline::new(&options, &MarkdownConverter, &FakeNotion::new())
        .prepare(&document)
        .unwrap();

    assert_eq!(prepared.title.as_deref(), Some("Title"));
    assert_eq!(prepared.source, DOC);
    match &prepared.blocks[..] {
        [Block::Image(image)] => {
            assert_eq!(
                image.source,
                ImageSource::External {
                    url: "http://x/img.png".to_string()
                }
            );
            let caption = plain_text(&image.caption);
            assert!(caption.contains("alt"));
            assert!(caption.contains("(width: 100px)"));
        }
        other => panic!("expected a single image block, got {other:?}"),
    }
}

#[test]
fn test_append_writes_title_then_content() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", DOC);
    let notion = FakeNotion::new().with_paragraphs(&["existing"]);

    let report = run(&SyncOptions::default(), &document, &notion);

    assert_eq!(report.state, SyncState::Written);
    assert_eq!(report.block_count, 1);
    assert_eq!(
        notion.calls(),
        vec![Call::UpdateTitle("Title".to_string()), Call::Append(1)]
    );
    assert_eq!(notion.child_kinds(), vec!["paragraph", "image"]);
    assert_eq!(notion.title.borrow().as_deref(), Some("Title"));
}

#[test]
fn test_replace_clears_every_page_of_children() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", "Fresh content\n");
    let notion = FakeNotion::new().with_paragraphs(&["a", "b", "c", "d", "e"]);
    let options = SyncOptions {
        mode: SyncMode::Replace,
        ..Default::default()
    };

    let report = run(&options, &document, &notion);

    assert_eq!(report.removed, 5);
    assert_eq!(notion.child_texts(), vec!["Fresh content"]);

    let calls = notion.calls();
    let first_delete = calls
        .iter()
        .position(|c| matches!(c, Call::Delete(_)))
        .unwrap();
    let last_list = calls
        .iter()
        .rposition(|c| matches!(c, Call::List(_)))
        .unwrap();
    assert!(last_list < first_delete, "listing must finish before deleting");
}

#[test]
fn test_matching_hash_skips_without_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", DOC);
    let notion =
        FakeNotion::new().with_property("Content Hash", &hash::digest(DOC.as_bytes()));
    let options = SyncOptions {
        hash: property_hash(),
        ..Default::default()
    };

    let report = run(&options, &document, &notion);

    assert_eq!(report.state, SyncState::Skipped);
    assert!(!notion.mutated());
}

#[test]
fn test_changed_hash_writes_content_then_hash() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", "New text\n");
    let notion = FakeNotion::new().with_property("Content Hash", "stale");
    let options = SyncOptions {
        hash: property_hash(),
        ..Default::default()
    };

    run(&options, &document, &notion);

    let digest = hash::digest(b"New text\n");
    assert_eq!(
        notion.calls(),
        vec![
            Call::GetProperty("Content Hash".to_string()),
            Call::Append(1),
            Call::SetProperty("Content Hash".to_string(), digest.clone()),
        ]
    );
    assert_eq!(
        notion.properties.borrow().get("Content Hash"),
        Some(&digest)
    );
}

#[test]
fn test_hash_first_order_writes_hash_before_content() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", "New text\n");
    let notion = FakeNotion::new();
    let options = SyncOptions {
        hash: Some(HashOptions {
            store: HashStore::Property("Checksum".to_string()),
            write_order: HashWriteOrder::HashFirst,
        }),
        ..Default::default()
    };

    run(&options, &document, &notion);

    let calls = notion.calls();
    assert_eq!(calls[0], Call::GetProperty("Checksum".to_string()));
    assert!(matches!(&calls[1], Call::SetProperty(name, _) if name == "Checksum"));
    assert_eq!(calls[2], Call::Append(1));
}

#[test]
fn test_hash_write_failure_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", "Body\n");
    let notion = FakeNotion {
        fail_set_property: true,
        ..Default::default()
    };
    let options = SyncOptions {
        hash: property_hash(),
        ..Default::default()
    };

    let report = run(&options, &document, &notion);

    assert_eq!(report.state, SyncState::Written);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("409"));
    assert_eq!(notion.child_texts(), vec!["Body"]);
}

#[test]
fn test_metadata_block_hash_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", "Body\n");
    let notion = FakeNotion::new();
    let options = SyncOptions {
        hash: Some(HashOptions {
            store: HashStore::Block,
            write_order: HashWriteOrder::ContentFirst,
        }),
        ..Default::default()
    };

    let first = run(&options, &document, &notion);
    assert_eq!(first.state, SyncState::Written);
    assert_eq!(notion.child_kinds(), vec!["paragraph", "code"]);
    let metadata = notion.children.borrow()[1].clone();
    assert_eq!(
        metadata.body["code"]["caption"][0]["text"]["content"],
        METADATA_CAPTION
    );

    let second = run(&options, &document, &notion);
    assert_eq!(second.state, SyncState::Skipped);
    assert_eq!(notion.child_kinds(), vec!["paragraph", "code"]);
}

#[test]
fn test_metadata_block_is_replaced_on_change() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", "One\n");
    let notion = FakeNotion::new();
    let options = SyncOptions {
        hash: Some(HashOptions {
            store: HashStore::Block,
            write_order: HashWriteOrder::ContentFirst,
        }),
        ..Default::default()
    };

    run(&options, &document, &notion);
    std::fs::write(&document, "Two\n").unwrap();
    run(&options, &document, &notion);

    assert_eq!(notion.child_kinds(), vec!["paragraph", "paragraph", "code"]);
    let stored = hash::find_metadata(&notion.children.borrow()).0;
    assert_eq!(stored, Some(hash::digest(b"Two\n")));
}

#[test]
fn test_dry_run_makes_no_remote_calls() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", DOC);
    let notion = FakeNotion::new();
    let options = SyncOptions {
        dry_run: true,
        mode: SyncMode::Replace,
        hash: property_hash(),
        ..Default::default()
    };

    let report = run(&options, &document, &notion);

    assert_eq!(report.state, SyncState::TitleSplit);
    assert_eq!(report.title.as_deref(), Some("Title"));
    assert_eq!(report.digest, hash::digest(DOC.as_bytes()));
    assert!(notion.calls().is_empty());
}

#[test]
fn test_dry_run_never_uploads_local_images() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.png"), b"png").unwrap();
    let document = write_doc(dir.path(), "doc.md", "# Title\n\n![local](a.png)\n");
    let notion = FakeNotion::new();
    let options = SyncOptions {
        dry_run: true,
        ..Default::default()
    };

    // The pipeline is given the remote uploader, as a library caller would
    let report = run(&options, &document, &notion);

    assert_eq!(report.state, SyncState::TitleSplit);
    assert_eq!(report.block_count, 1);
    assert!(notion.calls().is_empty());
}

#[test]
fn test_dry_run_still_detects_missing_local_image() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", "![gone](gone.png)\n");
    let notion = FakeNotion::new();
    let options = SyncOptions {
        dry_run: true,
        ..Default::default()
    };

    let err = Pipeline::new(&options, &MarkdownConverter, &notion)
        .dry_run(&document)
        .unwrap_err();

    assert_eq!(err.reached, SyncState::Converted);
    assert!(matches!(err.source, SyncError::LocalImageNotFound(_)));
    assert!(notion.calls().is_empty());
}

#[test]
fn test_rewrite_mapping_applies_before_hashing() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "docs/a.md", "Link to TARGET\n");
    let mapping = write_doc(
        dir.path(),
        "mapping.json",
        r#"{"docs/a.md": {"TARGET": "https://notion.so/abc"}}"#,
    );
    let notion = FakeNotion::new();
    let options = SyncOptions {
        rewrite_mapping: Some(mapping),
        ..Default::default()
    };

    let report = run(&options, &document, &notion);

    assert_eq!(report.digest, hash::digest(b"Link to https://notion.so/abc\n"));
    assert_eq!(notion.child_texts(), vec!["Link to https://notion.so/abc"]);
}

#[test]
fn test_missing_local_image_fails_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", "![pic](img/missing.png)\n");
    let notion = FakeNotion::new();

    let err = Pipeline::new(&SyncOptions::default(), &MarkdownConverter, &notion)
        .sync(&document, "page-1", &notion)
        .unwrap_err();

    assert_eq!(err.reached, SyncState::Converted);
    assert!(matches!(err.source, SyncError::LocalImageNotFound(_)));
    assert!(notion.calls().is_empty());
}

#[test]
fn test_undecodable_mapping_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", "Body\n");
    let mapping = write_doc(dir.path(), "mapping.json", "[\"not\", \"a\", \"map\"]");
    let notion = FakeNotion::new();
    let options = SyncOptions {
        rewrite_mapping: Some(mapping),
        ..Default::default()
    };

    let err = Pipeline::new(&options, &MarkdownConverter, &notion)
        .sync(&document, "page-1", &notion)
        .unwrap_err();

    assert_eq!(err.reached, SyncState::Loaded);
    assert!(matches!(err.source, SyncError::MappingDecode { .. }));
}

#[test]
fn test_missing_document_is_fatal() {
    let notion = FakeNotion::new();
    let err = Pipeline::new(&SyncOptions::default(), &MarkdownConverter, &notion)
        .sync(Path::new("/nonexistent/doc.md"), "page-1", &notion)
        .unwrap_err();

    assert_eq!(err.reached, SyncState::Started);
    assert!(matches!(err.source, SyncError::Io { .. }));
}

#[test]
fn test_missing_title_property_stops_before_content() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", DOC);
    let notion = FakeNotion {
        title_property: None,
        ..Default::default()
    };

    let err = Pipeline::new(&SyncOptions::default(), &MarkdownConverter, &notion)
        .sync(&document, "page-1", &notion)
        .unwrap_err();

    assert!(matches!(err.source, SyncError::MissingTitleProperty { .. }));
    assert!(!notion.calls().contains(&Call::Append(1)));
}

#[test]
fn test_append_failure_reports_remote_error() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", "Body\n");
    let notion = FakeNotion {
        fail_append: true,
        ..Default::default()
    };
    let options = SyncOptions {
        hash: property_hash(),
        ..Default::default()
    };

    let err = Pipeline::new(&options, &MarkdownConverter, &notion)
        .sync(&document, "page-1", &notion)
        .unwrap_err();

    assert_eq!(err.reached, SyncState::Replacing);
    assert!(matches!(err.source, SyncError::Api { status: 400, .. }));
    // No hash recorded for content that was not written
    assert!(notion.properties.borrow().is_empty());
}

#[test]
fn test_converter_failure_is_surfaced() {
    struct Rejecting;

    impl Converter for Rejecting {
        fn name(&self) -> &str {
            "rejecting"
        }

        fn convert(&self, _source: &str) -> Result<Vec<Block>, SyncError> {
            Err(SyncError::Markdown("unsupported construct".to_string()))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", "Body\n");
    let notion = FakeNotion::new();

    let err = Pipeline::new(&SyncOptions::default(), &Rejecting, &notion)
        .sync(&document, "page-1", &notion)
        .unwrap_err();

    assert_eq!(err.reached, SyncState::Rewritten);
    assert_eq!(
        err.source.to_string(),
        "markdown conversion failed: unsupported construct"
    );
}

#[test]
fn test_title_extraction_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_doc(dir.path(), "doc.md", "# Heading\n\nBody\n");
    let notion = FakeNotion::new();
    let options = SyncOptions {
        extract_title: false,
        ..Default::default()
    };

    let report = run(&options, &document, &notion);

    assert_eq!(report.title, None);
    assert_eq!(notion.child_kinds(), vec!["heading_1", "paragraph"]);
    assert!(!notion
        .calls()
        .iter()
        .any(|c| matches!(c, Call::UpdateTitle(_))));
}
