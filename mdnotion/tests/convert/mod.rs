//! Conversion tests (Markdown → validated blocks)
//!
//! These run the Markdown adapter and the patcher together, the way the pipeline does, and
//! check the resulting block list and its wire JSON.

use crate::common::{fixture, Call, FakeNotion};
use insta::assert_snapshot;
use mdnotion::blocks::{plain_text, Block, ImageSource};
use mdnotion::markdown::{self, Converter, MarkdownConverter};
use mdnotion::patch::Patcher;
use std::path::Path;

fn convert_and_patch(md: &str, document: &Path, notion: &FakeNotion) -> Vec<Block> {
    let blocks = MarkdownConverter.convert(md).expect("Should parse markdown");
    Patcher::new(document, notion)
        .patch(blocks)
        .expect("Should patch blocks")
}

fn kinds(blocks: &[Block]) -> Vec<&str> {
    blocks.iter().map(Block::kind).collect()
}

#[test]
fn test_kitchensink_block_kinds() {
    let path = fixture("kitchensink.md");
    let md = std::fs::read_to_string(&path).unwrap();
    let notion = FakeNotion::new();

    let blocks = convert_and_patch(&md, &path, &notion);

    assert_eq!(
        kinds(&blocks),
        vec![
            "heading_1",
            "paragraph",
            "image",
            "heading_2",
            "bulleted_list_item",
            "bulleted_list_item",
            "numbered_list_item",
            "numbered_list_item",
            "code",
            "code",
            "table",
            "quote",
            "divider",
            "image",
        ]
    );
}

#[test]
fn test_kitchensink_local_image_is_uploaded() {
    let path = fixture("kitchensink.md");
    let md = std::fs::read_to_string(&path).unwrap();
    let notion = FakeNotion::new();

    let blocks = convert_and_patch(&md, &path, &notion);

    assert_eq!(notion.calls(), vec![Call::Upload(fixture("img/logo.png"))]);
    match &blocks[2] {
        Block::Image(image) => {
            assert_eq!(
                image.source,
                ImageSource::FileUpload {
                    id: "upload-1".to_string()
                }
            );
            assert_eq!(
                plain_text(&image.caption),
                "Logo (width: 64px, height: 64px)"
            );
        }
        other => panic!("expected image, got {other:?}"),
    }
}

#[test]
fn test_kitchensink_html_image_is_external() {
    let path = fixture("kitchensink.md");
    let md = std::fs::read_to_string(&path).unwrap();
    let notion = FakeNotion::new();

    let blocks = convert_and_patch(&md, &path, &notion);

    match blocks.last() {
        Some(Block::Image(image)) => {
            assert_eq!(
                image.source,
                ImageSource::External {
                    url: "https://example.com/banner.png".to_string()
                }
            );
            assert_eq!(plain_text(&image.caption), "Banner (width: 800px)");
        }
        other => panic!("expected image, got {other:?}"),
    }
}

#[test]
fn test_kitchensink_code_languages() {
    let path = fixture("kitchensink.md");
    let md = std::fs::read_to_string(&path).unwrap();
    let notion = FakeNotion::new();

    let blocks = convert_and_patch(&md, &path, &notion);
    let languages: Vec<_> = blocks
        .iter()
        .filter_map(|block| match block {
            Block::Code(code) => code.language.clone(),
            _ => None,
        })
        .collect();

    assert_eq!(languages, vec!["shell", "plain text"]);
}

#[test]
fn test_nested_list_survives_patching() {
    let notion = FakeNotion::new();
    let blocks = convert_and_patch(
        "- Retries\n  - with backoff\n  -\n",
        Path::new("doc.md"),
        &notion,
    );

    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].children().len(), 1);
    assert_eq!(blocks[0].children()[0].plain_text(), "with backoff");
}

#[test]
fn test_paragraph_wire_json() {
    let blocks = markdown::convert("Hi **there**\n").unwrap();

    assert_snapshot!(serde_json::to_string(&blocks[0]).unwrap(), @r#"{"object":"block","type":"paragraph","paragraph":{"rich_text":[{"type":"text","text":{"content":"Hi "}},{"type":"text","text":{"content":"there"},"annotations":{"bold":true,"italic":false,"strikethrough":false,"underline":false,"code":false}}]}}"#);
}

#[test]
fn test_long_code_block_is_split_into_runs() {
    let body = "x".repeat(4500);
    let md = format!("```\n{body}\n```\n");
    let blocks = markdown::convert(&md).unwrap();

    match &blocks[0] {
        Block::Code(code) => {
            let lengths: Vec<usize> = code.rich_text.iter().map(|r| r.content.len()).collect();
            assert_eq!(lengths, vec![2000, 2000, 500]);
        }
        other => panic!("expected code, got {other:?}"),
    }
}

#[test]
fn test_blocks_nested_in_quote_and_task_are_patched() {
    let notion = FakeNotion::new();
    let md = "> ```\n> x\n> ```\n\n- [ ] task\n\n  ```\n  y\n  ```\n\n  ![pic](http://x/pic.png)\n";
    let blocks = convert_and_patch(md, Path::new("doc.md"), &notion);

    assert_eq!(kinds(&blocks), vec!["quote", "to_do"]);
    let quote = serde_json::to_value(&blocks[0]).unwrap();
    assert_eq!(quote["quote"]["children"][0]["code"]["language"], "plain text");

    let todo = serde_json::to_value(&blocks[1]).unwrap();
    let children = &todo["to_do"]["children"];
    assert_eq!(children[0]["code"]["language"], "plain text");
    assert_eq!(children[1]["type"], "image");
    assert_eq!(children[1]["image"]["external"]["url"], "http://x/pic.png");
}
