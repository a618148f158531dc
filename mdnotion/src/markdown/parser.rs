//! Markdown parsing (Markdown → blocks)
//!
//! Pipeline: Markdown string → Comrak AST → Block list

use crate::blocks::{
    text_length, Annotations, Block, Code, Heading, HeadingLevel, ListItem, Other, Paragraph,
    Quote, RichText, Table, TableRow, ToDo, MAX_TEXT_LENGTH,
};
use crate::error::SyncError;
use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{parse_document, Arena, ComrakOptions};
use serde_json::json;

/// Parse a Markdown string into blocks
pub fn parse_from_markdown(source: &str) -> Result<Vec<Block>, SyncError> {
    let arena = Arena::new();
    let options = default_comrak_options();
    let root = parse_document(&arena, source, &options);

    let mut blocks = Vec::new();
    for child in root.children() {
        collect_blocks_from_node(child, &mut blocks);
    }
    Ok(blocks)
}

fn default_comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.front_matter_delimiter = Some("---".to_string());
    options
}

/// Convert one Comrak block node, appending the result (if any) to `blocks`
fn collect_blocks_from_node<'a>(node: &'a AstNode<'a>, blocks: &mut Vec<Block>) {
    let node_data = node.data.borrow();

    match &node_data.value {
        NodeValue::Document => {
            for child in node.children() {
                collect_blocks_from_node(child, blocks);
            }
        }

        NodeValue::Heading(heading) => {
            blocks.push(Block::Heading(Heading {
                level: HeadingLevel::from_level(heading.level as usize),
                rich_text: inline_runs(node),
            }));
        }

        NodeValue::Paragraph => {
            blocks.push(Block::Paragraph(Paragraph {
                rich_text: inline_runs(node),
            }));
        }

        NodeValue::List(list) => {
            let ordered = matches!(list.list_type, ListType::Ordered);
            for item in node.children() {
                collect_list_item(item, ordered, blocks);
            }
        }

        NodeValue::Item(_) | NodeValue::TaskItem(_) => {
            // Items are normally reached through their list
            collect_list_item(node, false, blocks);
        }

        NodeValue::CodeBlock(code_block) => {
            let language = code_block
                .info
                .split_whitespace()
                .next()
                .map(str::to_string);
            let literal = code_block
                .literal
                .strip_suffix('\n')
                .unwrap_or(&code_block.literal);

            blocks.push(Block::Code(Code {
                rich_text: RichText::chunked(literal, Annotations::default(), None),
                language,
                caption: Vec::new(),
            }));
        }

        NodeValue::HtmlBlock(html) => {
            // Image tags are kept as text so the patcher can turn them into image blocks
            if html.literal.contains("<img") {
                blocks.push(Block::Paragraph(Paragraph {
                    rich_text: RichText::chunked(
                        html.literal.trim(),
                        Annotations::default(),
                        None,
                    ),
                }));
            }
        }

        NodeValue::BlockQuote => {
            let (rich_text, children) = split_leading_paragraph(node);
            blocks.push(Block::Quote(Quote {
                rich_text,
                children,
            }));
        }

        NodeValue::ThematicBreak => {
            blocks.push(Block::Other(Other {
                kind: "divider".to_string(),
                body: json!({}),
            }));
        }

        NodeValue::Table(table) => {
            let mut rows = Vec::new();
            let mut has_column_header = false;
            for row in node.children() {
                if let NodeValue::TableRow(header) = &row.data.borrow().value {
                    has_column_header |= *header;
                    let cells = row.children().map(inline_runs).collect();
                    rows.push(Block::TableRow(TableRow { cells }));
                }
            }

            blocks.push(Block::Table(Table {
                table_width: table.alignments.len(),
                has_column_header,
                has_row_header: false,
                children: rows,
            }));
        }

        NodeValue::FrontMatter(_) => {
            // Front matter is metadata for other tools, not page content
        }

        _ => {
            // Unknown block type, skip
        }
    }
}

/// Convert a list item (or task item) node
fn collect_list_item<'a>(node: &'a AstNode<'a>, ordered: bool, blocks: &mut Vec<Block>) {
    let (rich_text, children) = split_leading_paragraph(node);

    let checked = match &node.data.borrow().value {
        NodeValue::TaskItem(symbol) => Some(symbol.is_some()),
        _ => None,
    };

    let block = match checked {
        Some(checked) => Block::ToDo(ToDo {
            rich_text,
            checked,
            children,
        }),
        None => {
            let item = ListItem {
                rich_text,
                children,
            };
            if ordered {
                Block::NumberedListItem(item)
            } else {
                Block::BulletedListItem(item)
            }
        }
    };
    blocks.push(block);
}

/// The inline text of a container's first paragraph plus its remaining children as blocks.
fn split_leading_paragraph<'a>(node: &'a AstNode<'a>) -> (Vec<RichText>, Vec<Block>) {
    let mut rich_text = Vec::new();
    let mut children = Vec::new();

    for (index, child) in node.children().enumerate() {
        let is_paragraph = matches!(child.data.borrow().value, NodeValue::Paragraph);
        if index == 0 && is_paragraph {
            rich_text = inline_runs(child);
        } else {
            collect_blocks_from_node(child, &mut children);
        }
    }

    (rich_text, children)
}

/// Collect the rich-text runs of a node's inline children
fn inline_runs<'a>(node: &'a AstNode<'a>) -> Vec<RichText> {
    let mut runs = Vec::new();
    for child in node.children() {
        collect_inline_runs(child, Annotations::default(), None, &mut runs);
    }
    runs
}

fn collect_inline_runs<'a>(
    node: &'a AstNode<'a>,
    annotations: Annotations,
    link: Option<&str>,
    runs: &mut Vec<RichText>,
) {
    let node_data = node.data.borrow();

    match &node_data.value {
        NodeValue::Text(text) => push_text(runs, text, annotations, link),

        NodeValue::Code(code) => {
            let annotations = Annotations {
                code: true,
                ..annotations
            };
            push_text(runs, &code.literal, annotations, link);
        }

        NodeValue::SoftBreak => push_text(runs, " ", annotations, link),

        NodeValue::LineBreak => push_text(runs, "\n", annotations, link),

        NodeValue::Strong => {
            let annotations = Annotations {
                bold: true,
                ..annotations
            };
            for child in node.children() {
                collect_inline_runs(child, annotations, link, runs);
            }
        }

        NodeValue::Emph => {
            let annotations = Annotations {
                italic: true,
                ..annotations
            };
            for child in node.children() {
                collect_inline_runs(child, annotations, link, runs);
            }
        }

        NodeValue::Strikethrough => {
            let annotations = Annotations {
                strikethrough: true,
                ..annotations
            };
            for child in node.children() {
                collect_inline_runs(child, annotations, link, runs);
            }
        }

        NodeValue::Link(target) => {
            for child in node.children() {
                collect_inline_runs(child, annotations, Some(&target.url), runs);
            }
        }

        NodeValue::Image(image) => {
            // Re-emit the source syntax; the patcher turns it into an image block
            let mut alt = String::new();
            for child in node.children() {
                collect_text_content(child, &mut alt);
            }
            push_text(runs, &format!("![{alt}]({})", image.url), annotations, link);
        }

        NodeValue::HtmlInline(html) => push_text(runs, html, annotations, link),

        _ => {
            for child in node.children() {
                collect_inline_runs(child, annotations, link, runs);
            }
        }
    }
}

/// Collect plain text content from a node (used for image alt text)
fn collect_text_content<'a>(node: &'a AstNode<'a>, output: &mut String) {
    match &node.data.borrow().value {
        NodeValue::Text(text) => output.push_str(text),
        NodeValue::Code(code) => output.push_str(&code.literal),
        NodeValue::SoftBreak | NodeValue::LineBreak => output.push(' '),
        _ => {
            for child in node.children() {
                collect_text_content(child, output);
            }
        }
    }
}

/// Append text, merging into the previous run when the formatting matches
fn push_text(runs: &mut Vec<RichText>, text: &str, annotations: Annotations, link: Option<&str>) {
    if text.is_empty() {
        return;
    }
    if let Some(last) = runs.last_mut() {
        let same_format = last.annotations == annotations && last.link.as_deref() == link;
        let fits = text_length(&last.content) + text_length(text) <= MAX_TEXT_LENGTH;
        if same_format && fits {
            last.content.push_str(text);
            return;
        }
    }
    runs.extend(RichText::chunked(text, annotations, link));
}
