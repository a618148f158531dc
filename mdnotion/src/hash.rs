//! Content hashing used to skip syncs that would not change anything.
//!
//! The digest covers the source text after rewrite mapping and before Markdown conversion, so a
//! change to the mapping file that affects the output also changes the digest.
//!
//! The stored digest lives either in a page property or in a dedicated code block whose text is
//! a small JSON object (see [`PageMetadata`]).

use crate::blocks::{language, Block, Code, RichText};
use crate::remote::RemoteBlock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Caption marking the metadata code block.
pub const METADATA_CAPTION: &str = "Automation Metadata";

/// Lowercase hex SHA-256 of `source`.
pub fn digest(source: &[u8]) -> String {
    hex::encode(Sha256::digest(source))
}

/// Whether a sync is needed given the previously stored digest.
///
/// An absent or empty stored digest always syncs.
pub fn should_sync(source: &[u8], stored: Option<&str>) -> bool {
    !is_current(&digest(source), stored)
}

fn is_current(digest: &str, stored: Option<&str>) -> bool {
    matches!(stored, Some(stored) if !stored.is_empty() && stored == digest)
}

/// Metadata embedded in the page when the digest is kept in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub content_hash: String,
}

impl PageMetadata {
    pub fn new(content_hash: impl Into<String>) -> Self {
        PageMetadata {
            content_hash: content_hash.into(),
        }
    }

    /// Parse metadata from the text of a code block. Returns `None` for any other text.
    pub fn from_text(text: &str) -> Option<Self> {
        serde_json::from_str::<PageMetadata>(text.trim())
            .ok()
            .filter(|meta| !meta.content_hash.is_empty())
    }

    /// The code block carrying this metadata.
    pub fn to_block(&self) -> Block {
        let text = serde_json::json!({ "content_hash": self.content_hash }).to_string();
        Block::Code(Code {
            rich_text: vec![RichText::plain(text)],
            language: Some(language::normalize("json")),
            caption: vec![RichText::plain(METADATA_CAPTION)],
        })
    }
}

/// Locate metadata blocks among a page's children.
///
/// Returns the stored digest (from the first metadata block found) and the ids of every
/// metadata block so stale copies can be removed.
pub fn find_metadata(children: &[RemoteBlock]) -> (Option<String>, Vec<String>) {
    let mut stored = None;
    let mut ids = Vec::new();
    for block in children.iter().filter(|b| b.kind == "code") {
        if let Some(meta) = PageMetadata::from_text(&block.plain_text()) {
            if stored.is_none() {
                stored = Some(meta.content_hash);
            }
            ids.push(block.id.clone());
        }
    }
    (stored, ids)
}
