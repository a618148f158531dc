//! Page title extraction.
//!
//! A document that opens with a top-level heading uses it as the page title rather than as
//! content. Headings anywhere else stay where they are.

use crate::blocks::{Block, HeadingLevel};

/// Split a leading top-level heading off `blocks`.
///
/// Only the very first block is considered, and only if it is a level-one heading.
pub fn extract_title(mut blocks: Vec<Block>) -> (Option<Block>, Vec<Block>) {
    let is_title = matches!(
        blocks.first(),
        Some(Block::Heading(heading)) if heading.level == HeadingLevel::One
    );
    if is_title {
        let title = blocks.remove(0);
        (Some(title), blocks)
    } else {
        (None, blocks)
    }
}

/// The page title carried by a title block: the text of its first rich-text run.
pub fn title_text(block: &Block) -> Option<&str> {
    block
        .rich_text()
        .and_then(|runs| runs.first())
        .map(|run| run.content.as_str())
}
