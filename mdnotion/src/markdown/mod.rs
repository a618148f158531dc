//! Markdown adapter
//!
//! Turns Markdown source into the generic block list the rest of the pipeline works on.
//!
//! # Library Choice
//!
//! We use the `comrak` crate for parsing: CommonMark compliant, with the GFM extensions
//! (tables, strikethrough, autolinks, task lists) that Notion has native blocks for.
//!
//! # Element Mapping Table
//!
//! | Markdown                | Block                                   | Notes                                  |
//! |-------------------------|-----------------------------------------|----------------------------------------|
//! | `#` .. `######`         | heading_1 .. heading_3                  | Levels 4-6 clamp to heading_3          |
//! | Paragraph               | paragraph                               | Inline images kept as `![alt](url)`    |
//! | `-` / `1.` list items   | bulleted / numbered list item           | Nested blocks become children          |
//! | `- [ ]` task items      | to_do                                   | Nested blocks become children          |
//! | Fenced / indented code  | code                                    | First word of the info string          |
//! | Block quote             | quote                                   | Blocks after the first paragraph nest  |
//! | `---`                   | divider (passthrough)                   |                                        |
//! | GFM table               | table + table_row                       | First row is the column header         |
//! | HTML block with `<img`  | paragraph carrying the tag text         | Other HTML blocks are dropped          |
//! | Front matter            | dropped                                 |                                        |
//!
//! Images are deliberately left as text: the patcher decides between an uploaded and an
//! external image block once it knows where the document lives.

pub mod parser;

use crate::blocks::Block;
use crate::error::SyncError;

/// A source format that converts into blocks.
pub trait Converter {
    /// The name of this converter (e.g. "markdown")
    fn name(&self) -> &str;

    /// Convert source text into a block list
    fn convert(&self, source: &str) -> Result<Vec<Block>, SyncError>;
}

/// Converter for CommonMark + GFM Markdown
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownConverter;

impl Converter for MarkdownConverter {
    fn name(&self) -> &str {
        "markdown"
    }

    fn convert(&self, source: &str) -> Result<Vec<Block>, SyncError> {
        parser::parse_from_markdown(source)
    }
}

/// Convert Markdown source with the default converter.
pub fn convert(source: &str) -> Result<Vec<Block>, SyncError> {
    MarkdownConverter.convert(source)
}
