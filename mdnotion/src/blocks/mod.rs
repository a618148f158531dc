//! Notion block model.
//!
//! A document is an ordered `Vec<Block>`. List items, to-dos, quotes and tables own their
//! children; there are no back-references, so every transform over the tree is a plain
//! recursive rebuild.
//!
//! Blocks serialize to the JSON shape the Notion API expects when appending children:
//!
//! ```json
//! {"object": "block", "type": "paragraph", "paragraph": {"rich_text": [...]}}
//! ```
//!
//! Block kinds the pipeline has no special handling for are carried as [`Block::Other`], which
//! keeps the raw body so it is written back verbatim.

pub mod language;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Maximum length of a single rich-text run accepted by the remote API, in UTF-16 code units.
pub const MAX_TEXT_LENGTH: usize = 2000;

/// Length of `text` as the remote API counts it.
pub fn text_length(text: &str) -> usize {
    text.encode_utf16().count()
}

/// One node of the remote document model.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Heading(Heading),
    BulletedListItem(ListItem),
    NumberedListItem(ListItem),
    ToDo(ToDo),
    Quote(Quote),
    Code(Code),
    Image(Image),
    Table(Table),
    TableRow(TableRow),
    Other(Other),
}

impl Block {
    /// The remote `type` tag of this block.
    pub fn kind(&self) -> &str {
        match self {
            Block::Paragraph(_) => "paragraph",
            Block::Heading(heading) => heading.level.kind(),
            Block::BulletedListItem(_) => "bulleted_list_item",
            Block::NumberedListItem(_) => "numbered_list_item",
            Block::ToDo(_) => "to_do",
            Block::Quote(_) => "quote",
            Block::Code(_) => "code",
            Block::Image(_) => "image",
            Block::Table(_) => "table",
            Block::TableRow(_) => "table_row",
            Block::Other(other) => &other.kind,
        }
    }

    /// Rich text owned directly by this block, if the kind carries any.
    pub fn rich_text(&self) -> Option<&[RichText]> {
        match self {
            Block::Paragraph(p) => Some(&p.rich_text),
            Block::Heading(h) => Some(&h.rich_text),
            Block::BulletedListItem(item) | Block::NumberedListItem(item) => Some(&item.rich_text),
            Block::ToDo(todo) => Some(&todo.rich_text),
            Block::Quote(quote) => Some(&quote.rich_text),
            Block::Code(code) => Some(&code.rich_text),
            _ => None,
        }
    }

    /// Concatenated plain text of the block's own rich text (children excluded).
    pub fn plain_text(&self) -> String {
        self.rich_text().map(plain_text).unwrap_or_default()
    }

    /// Child blocks owned by this block.
    pub fn children(&self) -> &[Block] {
        match self {
            Block::BulletedListItem(item) | Block::NumberedListItem(item) => &item.children,
            Block::ToDo(todo) => &todo.children,
            Block::Quote(quote) => &quote.children,
            Block::Table(table) => &table.children,
            _ => &[],
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph(Paragraph {
            rich_text: vec![RichText::plain(text)],
        })
    }

    pub fn heading(level: usize, text: impl Into<String>) -> Self {
        Block::Heading(Heading {
            level: HeadingLevel::from_level(level),
            rich_text: vec![RichText::plain(text)],
        })
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("object", "block")?;
        map.serialize_entry("type", self.kind())?;
        match self {
            Block::Paragraph(body) => map.serialize_entry("paragraph", body)?,
            Block::Heading(body) => map.serialize_entry(body.level.kind(), body)?,
            Block::BulletedListItem(body) => map.serialize_entry("bulleted_list_item", body)?,
            Block::NumberedListItem(body) => map.serialize_entry("numbered_list_item", body)?,
            Block::ToDo(body) => map.serialize_entry("to_do", body)?,
            Block::Quote(body) => map.serialize_entry("quote", body)?,
            Block::Code(body) => map.serialize_entry("code", body)?,
            Block::Image(body) => map.serialize_entry("image", body)?,
            Block::Table(body) => map.serialize_entry("table", body)?,
            Block::TableRow(body) => map.serialize_entry("table_row", body)?,
            Block::Other(other) => map.serialize_entry(&other.kind, &other.body)?,
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paragraph {
    pub rich_text: Vec<RichText>,
}

/// Heading depth. The remote model only knows three levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    One,
    Two,
    Three,
}

impl HeadingLevel {
    /// Map a Markdown heading level (1-6) onto the remote levels, clamping 4-6 to three.
    pub fn from_level(level: usize) -> Self {
        match level {
            0 | 1 => HeadingLevel::One,
            2 => HeadingLevel::Two,
            _ => HeadingLevel::Three,
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            HeadingLevel::One => "heading_1",
            HeadingLevel::Two => "heading_2",
            HeadingLevel::Three => "heading_3",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heading {
    #[serde(skip)]
    pub level: HeadingLevel,
    pub rich_text: Vec<RichText>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem {
    pub rich_text: Vec<RichText>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

/// A task list item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToDo {
    pub rich_text: Vec<RichText>,
    pub checked: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub rich_text: Vec<RichText>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Code {
    pub rich_text: Vec<RichText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub caption: Vec<RichText>,
}

/// Where an image block's pixels live.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// A file previously uploaded to the service, referenced by its upload handle
    FileUpload { id: String },
    /// A publicly reachable URL
    External { url: String },
}

impl ImageSource {
    fn kind(&self) -> &'static str {
        match self {
            ImageSource::FileUpload { .. } => "file_upload",
            ImageSource::External { .. } => "external",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub source: ImageSource,
    pub caption: Vec<RichText>,
}

#[derive(Serialize)]
struct FileUploadRef<'a> {
    id: &'a str,
}

#[derive(Serialize)]
struct ExternalRef<'a> {
    url: &'a str,
}

impl Serialize for Image {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("type", self.source.kind())?;
        match &self.source {
            ImageSource::FileUpload { id } => {
                map.serialize_entry("file_upload", &FileUploadRef { id })?
            }
            ImageSource::External { url } => map.serialize_entry("external", &ExternalRef { url })?,
        }
        map.serialize_entry("caption", &self.caption)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub table_width: usize,
    pub has_column_header: bool,
    pub has_row_header: bool,
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub cells: Vec<Vec<RichText>>,
}

/// A block kind passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Other {
    pub kind: String,
    pub body: serde_json::Value,
}

/// Inline formatting flags of a rich-text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
}

impl Annotations {
    pub fn is_plain(&self) -> bool {
        *self == Annotations::default()
    }
}

/// One run of uniformly formatted text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RichText {
    pub content: String,
    pub link: Option<String>,
    pub annotations: Annotations,
}

impl RichText {
    pub fn plain(content: impl Into<String>) -> Self {
        RichText {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Build runs for `content`, splitting it on char boundaries so that no run exceeds
    /// [`MAX_TEXT_LENGTH`] UTF-16 code units. Empty content yields no runs.
    pub fn chunked(content: &str, annotations: Annotations, link: Option<&str>) -> Vec<RichText> {
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut units = 0;
        for (idx, ch) in content.char_indices() {
            let width = ch.len_utf16();
            if units + width > MAX_TEXT_LENGTH {
                chunks.push(&content[start..idx]);
                start = idx;
                units = 0;
            }
            units += width;
        }
        if start < content.len() {
            chunks.push(&content[start..]);
        }

        chunks
            .into_iter()
            .map(|chunk| RichText {
                content: chunk.to_string(),
                link: link.map(str::to_string),
                annotations,
            })
            .collect()
    }
}

#[derive(Serialize)]
struct LinkRef<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct TextBody<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<LinkRef<'a>>,
}

impl Serialize for RichText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", "text")?;
        map.serialize_entry(
            "text",
            &TextBody {
                content: &self.content,
                link: self.link.as_deref().map(|url| LinkRef { url }),
            },
        )?;
        if !self.annotations.is_plain() {
            map.serialize_entry("annotations", &self.annotations)?;
        }
        map.end()
    }
}

/// Concatenate the text content of a sequence of runs.
pub fn plain_text(runs: &[RichText]) -> String {
    runs.iter().map(|run| run.content.as_str()).collect()
}
