//! Remote document service.
//!
//! The pipeline talks to the service through three narrow traits so it can run against the
//! real HTTP client ([`NotionClient`]) or an in-memory double in tests:
//!
//! - [`FileUploader`]: two-phase upload of a local file, returning a handle
//! - [`BlockStore`]: list/delete/append the children of a block or page
//! - [`PageProperties`]: read and write page properties, including the title
//!
//! [`NotionApi`] bundles the last two for callers that need the whole surface.

pub mod http;
pub mod mime;
pub mod notion;

pub use notion::{NotionClient, NotionSettings};

use crate::blocks::Block;
use crate::error::SyncError;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Handle returned for files uploaded in dry-run mode.
pub const DRY_RUN_UPLOAD_ID: &str = "dry-run-upload";

/// Uploads local files and returns the handle to embed in an image block.
pub trait FileUploader {
    fn upload_file(&self, path: &Path) -> Result<String, SyncError>;
}

/// Child-block storage of pages.
pub trait BlockStore {
    /// Fetch one page of children, starting at `cursor`.
    fn list_children(&self, block_id: &str, cursor: Option<&str>)
        -> Result<ChildrenPage, SyncError>;

    fn delete_block(&self, block_id: &str) -> Result<(), SyncError>;

    /// Append `blocks` after the existing children of `block_id`.
    fn append_children(&self, block_id: &str, blocks: &[Block]) -> Result<(), SyncError>;
}

/// Page property access.
pub trait PageProperties {
    /// Plain text of a rich-text property. `None` if the property is absent or empty.
    fn get_property(&self, page_id: &str, name: &str) -> Result<Option<String>, SyncError>;

    fn set_property(&self, page_id: &str, name: &str, value: &str) -> Result<(), SyncError>;

    /// Set the page title, whatever the title property happens to be called.
    fn update_title(&self, page_id: &str, title: &str) -> Result<(), SyncError>;
}

/// Everything the sync pipeline needs from the remote service besides uploads.
pub trait NotionApi: BlockStore + PageProperties {}

impl<T: BlockStore + PageProperties> NotionApi for T {}

/// A child block as returned by the listing endpoint.
///
/// Only the id and type are interpreted; the rest of the object is kept as-is.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub body: Value,
}

impl RemoteBlock {
    /// Plain text of the block's rich text, if its body carries any.
    pub fn plain_text(&self) -> String {
        let runs = self
            .body
            .get(&self.kind)
            .and_then(|body| body.get("rich_text"))
            .and_then(Value::as_array);

        let Some(runs) = runs else {
            return String::new();
        };

        runs.iter()
            .filter_map(|run| {
                run.get("plain_text")
                    .or_else(|| run.get("text").and_then(|text| text.get("content")))
                    .and_then(Value::as_str)
            })
            .collect()
    }
}

/// One page of a paginated children listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChildrenPage {
    pub results: Vec<RemoteBlock>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

impl ChildrenPage {
    /// Cursor for the following page, if the listing continues.
    pub fn continuation(&self) -> Option<&str> {
        match self.next_cursor.as_deref() {
            Some(cursor) if self.has_more && !cursor.is_empty() => Some(cursor),
            _ => None,
        }
    }
}

/// List every child of `block_id`, following cursors until the listing is exhausted.
pub fn list_all_children<S: BlockStore + ?Sized>(
    store: &S,
    block_id: &str,
) -> Result<Vec<RemoteBlock>, SyncError> {
    let mut children = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = store.list_children(block_id, cursor.as_deref())?;
        let next = page.continuation().map(str::to_string);
        children.extend(page.results);
        match next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(children)
}

/// Delete every existing child of `page_id`. Returns the number of blocks removed.
///
/// The full listing is drained before the first delete.
pub fn clear_children<S: BlockStore + ?Sized>(store: &S, page_id: &str) -> Result<usize, SyncError> {
    let children = list_all_children(store, page_id)?;
    for child in &children {
        debug!("Deleting block {} ({})", child.id, child.kind);
        store.delete_block(&child.id)?;
    }
    Ok(children.len())
}

/// Uploader used for dry runs: checks the file is readable and hands back a placeholder.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunUploader;

impl FileUploader for DryRunUploader {
    fn upload_file(&self, path: &Path) -> Result<String, SyncError> {
        std::fs::metadata(path).map_err(|e| SyncError::io(path, e))?;
        debug!("Dry run: skipping upload of {}", path.display());
        Ok(DRY_RUN_UPLOAD_ID.to_string())
    }
}
