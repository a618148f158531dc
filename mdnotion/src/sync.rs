//! Sync orchestration.
//!
//! One run moves a document through these states:
//!
//! ```text
//! Started → Loaded → Rewritten → Converted → ImageProcessed → Validated → TitleSplit
//!         → HashChecked → { Skipped | Replacing → Written }
//! ```
//!
//! [`Pipeline::prepare`] covers everything up to `TitleSplit` and performs no remote mutation
//! beyond image uploads. [`Pipeline::apply`] does the remote part. A failure at any point is
//! reported as a [`PipelineError`] carrying the last state reached.

use crate::blocks::Block;
use crate::error::SyncError;
use crate::hash::{self, PageMetadata};
use crate::markdown::Converter;
use crate::patch::Patcher;
use crate::remote::{clear_children, list_all_children, DryRunUploader, FileUploader, NotionApi};
use crate::rewrite::RewriteMapping;
use crate::title::{extract_title, title_text};
use log::{debug, info, warn};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Property holding the content hash unless configured otherwise.
pub const DEFAULT_HASH_PROPERTY: &str = "Content Hash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing done yet
    Started,
    Loaded,
    Rewritten,
    Converted,
    ImageProcessed,
    Validated,
    TitleSplit,
    HashChecked,
    /// Stored hash matched; nothing was written
    Skipped,
    Replacing,
    Written,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Started => "started",
            SyncState::Loaded => "loaded",
            SyncState::Rewritten => "rewritten",
            SyncState::Converted => "converted",
            SyncState::ImageProcessed => "image-processed",
            SyncState::Validated => "validated",
            SyncState::TitleSplit => "title-split",
            SyncState::HashChecked => "hash-checked",
            SyncState::Skipped => "skipped",
            SyncState::Replacing => "replacing",
            SyncState::Written => "written",
        };
        f.write_str(name)
    }
}

/// How new content relates to what the page already has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Add after the existing children
    #[default]
    Append,
    /// Delete every existing child first
    Replace,
}

/// Where the content hash is kept on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashStore {
    /// A rich-text page property with this name
    Property(String),
    /// A code block captioned "Automation Metadata" among the page children
    Block,
}

impl Default for HashStore {
    fn default() -> Self {
        HashStore::Property(DEFAULT_HASH_PROPERTY.to_string())
    }
}

/// When the new hash is written relative to the content.
///
/// Only applies to property storage; a metadata block is always appended after the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashWriteOrder {
    /// Content, then hash
    #[default]
    ContentFirst,
    HashFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HashOptions {
    pub store: HashStore,
    pub write_order: HashWriteOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub mode: SyncMode,
    /// Use a leading top-level heading as the page title
    pub extract_title: bool,
    /// Skip the write when the stored hash matches. `None` disables hashing.
    pub hash: Option<HashOptions>,
    pub rewrite_mapping: Option<PathBuf>,
    /// Stop after title extraction
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            mode: SyncMode::Append,
            extract_title: true,
            hash: None,
            rewrite_mapping: None,
            dry_run: false,
        }
    }
}

/// A fatal pipeline failure and the last state reached before it.
#[derive(Debug, Error)]
#[error("{source} (last state: {reached})")]
pub struct PipelineError {
    pub reached: SyncState,
    #[source]
    pub source: SyncError,
}

fn failed_after(reached: SyncState) -> impl FnOnce(SyncError) -> PipelineError {
    move |source| PipelineError { reached, source }
}

/// A document converted and validated, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDocument {
    pub title: Option<String>,
    pub blocks: Vec<Block>,
    /// Source text after rewrite mapping
    pub source: String,
    /// Digest of `source`
    pub digest: String,
}

/// Outcome of a run that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// `Written`, `Skipped`, or `TitleSplit` for a dry run
    pub state: SyncState,
    pub title: Option<String>,
    pub block_count: usize,
    pub digest: String,
    /// Children deleted before writing (replace mode)
    pub removed: usize,
    /// Non-fatal problems, such as a failed hash write-back
    pub warnings: Vec<String>,
}

impl SyncReport {
    fn new(state: SyncState, document: &PreparedDocument) -> Self {
        SyncReport {
            state,
            title: document.title.clone(),
            block_count: document.blocks.len(),
            digest: document.digest.clone(),
            removed: 0,
            warnings: Vec::new(),
        }
    }
}

/// Runs documents through conversion and onto a page.
pub struct Pipeline<'a> {
    options: &'a SyncOptions,
    converter: &'a dyn Converter,
    uploader: &'a dyn FileUploader,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        options: &'a SyncOptions,
        converter: &'a dyn Converter,
        uploader: &'a dyn FileUploader,
    ) -> Self {
        Pipeline {
            options,
            converter,
            uploader,
        }
    }

    /// Run the full pipeline for `document` against `page_id`.
    ///
    /// In dry-run mode this behaves like [`Pipeline::dry_run`] and `api` is never called.
    pub fn sync(
        &self,
        document: &Path,
        page_id: &str,
        api: &dyn NotionApi,
    ) -> Result<SyncReport, PipelineError> {
        if self.options.dry_run {
            return self.dry_run(document);
        }
        let prepared = self.prepare(document)?;
        self.apply(prepared, page_id, api)
    }

    /// Prepare `document` and report what would be written, without touching the page.
    ///
    /// Local images are only checked for existence; the configured uploader is not used.
    pub fn dry_run(&self, document: &Path) -> Result<SyncReport, PipelineError> {
        let prepared = self.prepare_with(document, &DryRunUploader)?;
        info!(
            "Dry run: {} blocks prepared, no changes made to Notion",
            prepared.blocks.len()
        );
        Ok(SyncReport::new(SyncState::TitleSplit, &prepared))
    }

    /// Read, rewrite, convert and validate `document`, and split off its title.
    pub fn prepare(&self, document: &Path) -> Result<PreparedDocument, PipelineError> {
        self.prepare_with(document, self.uploader)
    }

    fn prepare_with(
        &self,
        document: &Path,
        uploader: &dyn FileUploader,
    ) -> Result<PreparedDocument, PipelineError> {
        let source = fs::read_to_string(document)
            .map_err(|e| SyncError::io(document, e))
            .map_err(failed_after(SyncState::Started))?;
        debug!("Loaded {} ({} bytes)", document.display(), source.len());

        let source = match &self.options.rewrite_mapping {
            Some(mapping_path) => {
                let mapping =
                    RewriteMapping::load(mapping_path).map_err(failed_after(SyncState::Loaded))?;
                mapping.apply(&source, &document.to_string_lossy())
            }
            None => source,
        };
        let digest = hash::digest(source.as_bytes());
        debug!("Content hash: {digest}");

        let blocks = self
            .converter
            .convert(&source)
            .map_err(failed_after(SyncState::Rewritten))?;
        debug!("{} converter produced {} blocks", self.converter.name(), blocks.len());

        let blocks = Patcher::new(document, uploader)
            .patch(blocks)
            .map_err(failed_after(SyncState::Converted))?;

        let (title, blocks) = if self.options.extract_title {
            let (title_block, rest) = extract_title(blocks);
            let title = title_block
                .as_ref()
                .and_then(title_text)
                .map(str::to_string);
            (title, rest)
        } else {
            (None, blocks)
        };

        Ok(PreparedDocument {
            title,
            blocks,
            source,
            digest,
        })
    }

    /// Write a prepared document to `page_id`.
    pub fn apply(
        &self,
        document: PreparedDocument,
        page_id: &str,
        api: &dyn NotionApi,
    ) -> Result<SyncReport, PipelineError> {
        let mut report = SyncReport::new(SyncState::Written, &document);

        if let Some(hash_options) = &self.options.hash {
            let stored = read_stored_hash(api, page_id, &hash_options.store)
                .map_err(failed_after(SyncState::TitleSplit))?;
            debug!("Stored hash: {}", stored.as_deref().unwrap_or("<none>"));
            if !hash::should_sync(document.source.as_bytes(), stored.as_deref()) {
                info!("No content change detected. Skipping update.");
                report.state = SyncState::Skipped;
                return Ok(report);
            }
        }

        let hash_first = matches!(
            &self.options.hash,
            Some(HashOptions {
                store: HashStore::Property(_),
                write_order: HashWriteOrder::HashFirst,
            })
        );
        if hash_first {
            self.write_hash(api, page_id, &document.digest, &mut report);
        }

        if let Some(title) = &document.title {
            api.update_title(page_id, title)
                .map_err(failed_after(SyncState::HashChecked))?;
            debug!("Updated page title to '{title}'");
        }

        if self.options.mode == SyncMode::Replace {
            report.removed =
                clear_children(api, page_id).map_err(failed_after(SyncState::HashChecked))?;
            debug!("Removed {} existing blocks", report.removed);
        }

        api.append_children(page_id, &document.blocks)
            .map_err(failed_after(SyncState::Replacing))?;
        info!("Wrote {} blocks to page {page_id}", document.blocks.len());

        if self.options.hash.is_some() && !hash_first {
            self.write_hash(api, page_id, &document.digest, &mut report);
        }

        Ok(report)
    }

    /// Store the new hash. Failures are recorded as warnings, never returned.
    fn write_hash(&self, api: &dyn NotionApi, page_id: &str, digest: &str, report: &mut SyncReport) {
        let Some(hash_options) = &self.options.hash else {
            return;
        };
        let result = match &hash_options.store {
            HashStore::Property(name) => api.set_property(page_id, name, digest),
            HashStore::Block => write_metadata_block(api, page_id, digest),
        };
        if let Err(err) = result {
            let message = format!("failed to store content hash: {err}");
            warn!("{message}");
            report.warnings.push(message);
        }
    }
}

fn read_stored_hash(
    api: &dyn NotionApi,
    page_id: &str,
    store: &HashStore,
) -> Result<Option<String>, SyncError> {
    match store {
        HashStore::Property(name) => api.get_property(page_id, name),
        HashStore::Block => {
            let children = list_all_children(api, page_id)?;
            Ok(hash::find_metadata(&children).0)
        }
    }
}

/// Replace any metadata blocks on the page with one carrying `digest`.
fn write_metadata_block(api: &dyn NotionApi, page_id: &str, digest: &str) -> Result<(), SyncError> {
    let children = list_all_children(api, page_id)?;
    let (_, stale) = hash::find_metadata(&children);
    for id in &stale {
        debug!("Removing stale metadata block {id}");
        api.delete_block(id)?;
    }
    api.append_children(page_id, &[PageMetadata::new(digest).to_block()])
}
