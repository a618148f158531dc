//! Notion REST client.
//!
//! Endpoints used:
//!
//! | Operation        | Request                                  |
//! |------------------|------------------------------------------|
//! | upload slot      | `POST /file_uploads`                     |
//! | file contents    | `POST {upload_url}` (multipart `file`)   |
//! | list children    | `GET /blocks/{id}/children`              |
//! | append children  | `PATCH /blocks/{id}/children`            |
//! | delete block     | `DELETE /blocks/{id}`                    |
//! | read page        | `GET /pages/{id}`                        |
//! | update page      | `PATCH /pages/{id}`                      |
//!
//! Appends, upload slots and file contents are only resent when the service provably did
//! not act on the first attempt; everything else retries on any transient failure.

use super::http::{NotionHttp, Replay, RetryPolicy};
use super::{mime, BlockStore, ChildrenPage, FileUploader, PageProperties};
use crate::blocks::{Annotations, Block, RichText};
use crate::error::SyncError;
use log::debug;
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.notion.com/v1";
pub const DEFAULT_API_VERSION: &str = "2022-06-28";

/// Maximum number of children accepted by one append request.
pub const APPEND_BATCH_SIZE: usize = 100;

const LIST_PAGE_SIZE: &str = "100";

/// Connection settings for [`NotionClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotionSettings {
    pub api_base: String,
    pub version: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for NotionSettings {
    fn default() -> Self {
        NotionSettings {
            api_base: DEFAULT_API_BASE.to_string(),
            version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadSlot {
    id: String,
    upload_url: String,
}

/// Client for the subset of the Notion API used by the sync pipeline.
#[derive(Debug, Clone)]
pub struct NotionClient {
    http: NotionHttp,
    api_base: String,
}

impl NotionClient {
    pub fn new(token: &str, settings: &NotionSettings) -> Result<Self, SyncError> {
        if token.trim().is_empty() {
            return Err(SyncError::MissingToken);
        }
        let http = NotionHttp::new(token, &settings.version, settings.timeout, settings.retry)?;
        Ok(NotionClient {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    fn create_upload_slot(&self) -> Result<UploadSlot, SyncError> {
        let response = self
            .http
            .post_json(&self.url("file_uploads"), &json!({}), Replay::Unsafe)?;
        Ok(serde_json::from_value(response)?)
    }

    fn send_file(&self, upload_url: &str, path: &Path) -> Result<(), SyncError> {
        let data = fs::read(path).map_err(|e| SyncError::io(path, e))?;
        let content_type = mime::content_type(path);
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        debug!("Uploading {} ({content_type}) to {upload_url}", path.display());
        self.http.send(Replay::Unsafe, |client| {
            let part = Part::bytes(data.clone())
                .file_name(file_name.clone())
                .mime_str(content_type)?;
            Ok(client.post(upload_url).multipart(Form::new().part("file", part)))
        })?;
        Ok(())
    }

    fn fetch_page(&self, page_id: &str) -> Result<Value, SyncError> {
        self.http.get(&self.url(&format!("pages/{page_id}")), &[])
    }

    fn update_page(&self, page_id: &str, body: &Value) -> Result<(), SyncError> {
        self.http
            .patch_json(&self.url(&format!("pages/{page_id}")), body, Replay::Safe)
            .inspect_err(|_| debug!("Request body: {body}"))?;
        Ok(())
    }
}

impl FileUploader for NotionClient {
    fn upload_file(&self, path: &Path) -> Result<String, SyncError> {
        let slot = self.create_upload_slot()?;
        self.send_file(&slot.upload_url, path)?;
        debug!("Uploaded {} as {}", path.display(), slot.id);
        Ok(slot.id)
    }
}

impl BlockStore for NotionClient {
    fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChildrenPage, SyncError> {
        let mut query = vec![("page_size", LIST_PAGE_SIZE)];
        if let Some(cursor) = cursor {
            query.push(("start_cursor", cursor));
        }
        let response = self
            .http
            .get(&self.url(&format!("blocks/{block_id}/children")), &query)?;
        Ok(serde_json::from_value(response)?)
    }

    fn delete_block(&self, block_id: &str) -> Result<(), SyncError> {
        self.http.delete(&self.url(&format!("blocks/{block_id}")))?;
        Ok(())
    }

    fn append_children(&self, block_id: &str, blocks: &[Block]) -> Result<(), SyncError> {
        let url = self.url(&format!("blocks/{block_id}/children"));
        for_each_batch(blocks, |batch| {
            let body = json!({ "children": serde_json::to_value(batch)? });
            self.http
                .patch_json(&url, &body, Replay::Unsafe)
                .inspect_err(|_| debug!("Request body: {body}"))?;
            Ok(())
        })
    }
}

impl PageProperties for NotionClient {
    fn get_property(&self, page_id: &str, name: &str) -> Result<Option<String>, SyncError> {
        let page = self.fetch_page(page_id)?;
        Ok(rich_text_property(&page, name))
    }

    fn set_property(&self, page_id: &str, name: &str, value: &str) -> Result<(), SyncError> {
        self.update_page(page_id, &property_update_body(name, value)?)
    }

    fn update_title(&self, page_id: &str, title: &str) -> Result<(), SyncError> {
        let page = self.fetch_page(page_id)?;
        let name = title_property_name(&page).ok_or_else(|| SyncError::MissingTitleProperty {
            page_id: page_id.to_string(),
        })?;
        self.update_page(page_id, &title_update_body(&name, title)?)
    }
}

/// Hand `blocks` to `send` in order, at most [`APPEND_BATCH_SIZE`] at a time.
///
/// Stops at the first failed batch; earlier batches stay written.
fn for_each_batch<F>(blocks: &[Block], mut send: F) -> Result<(), SyncError>
where
    F: FnMut(&[Block]) -> Result<(), SyncError>,
{
    blocks.chunks(APPEND_BATCH_SIZE).try_for_each(|batch| send(batch))
}

fn property_update_body(name: &str, value: &str) -> Result<Value, SyncError> {
    let runs = serde_json::to_value(RichText::chunked(value, Annotations::default(), None))?;
    Ok(json!({ "properties": { name: { "rich_text": runs } } }))
}

fn title_update_body(name: &str, title: &str) -> Result<Value, SyncError> {
    let runs = serde_json::to_value(RichText::chunked(title, Annotations::default(), None))?;
    Ok(json!({ "properties": { name: { "title": runs } } }))
}

/// Plain text of a rich-text property in a page object. `None` when absent or empty.
fn rich_text_property(page: &Value, name: &str) -> Option<String> {
    let runs = page
        .get("properties")?
        .get(name)?
        .get("rich_text")?
        .as_array()?;
    let text: String = runs
        .iter()
        .filter_map(|run| run.get("plain_text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

/// Name of the property whose schema type is `title`.
fn title_property_name(page: &Value) -> Option<String> {
    page.get("properties")?
        .as_object()?
        .iter()
        .find(|(_, prop)| prop.get("type").and_then(Value::as_str) == Some("title"))
        .map(|(name, _)| name.clone())
}
