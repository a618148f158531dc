//! Block validation and repair.
//!
//! Rules, checked per node in this order:
//!
//! 1. List items with no text are dropped along with their children.
//! 2. Code blocks without a language get [`language::PLAIN_TEXT`].
//! 3. Code block languages are normalized through [`language::normalize`].
//! 4. A paragraph containing an image reference becomes one image block built from the
//!    first reference; any further references in that paragraph are lost.
//! 5. Everything else passes through, with children patched recursively (list items, to-dos,
//!    quotes and tables).
//!
//! Dropping happens before any child is visited, so images inside a dropped item are never
//! uploaded.

use crate::blocks::{
    language, plain_text, Block, Code, Image, ImageSource, ListItem, Paragraph, RichText,
};
use crate::error::SyncError;
use crate::images::{find_image_references, ImageReference};
use crate::remote::FileUploader;
use log::debug;
use std::path::{Path, PathBuf};

/// Patches block trees for one document.
pub struct Patcher<'a> {
    base_dir: PathBuf,
    uploader: &'a dyn FileUploader,
}

impl<'a> Patcher<'a> {
    /// A patcher resolving local images relative to the directory of `document_path`.
    pub fn new(document_path: &Path, uploader: &'a dyn FileUploader) -> Self {
        let base_dir = document_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Patcher { base_dir, uploader }
    }

    /// Patch a block list, returning the repaired list.
    ///
    /// Fails only when a local image cannot be found or uploaded.
    pub fn patch(&self, blocks: Vec<Block>) -> Result<Vec<Block>, SyncError> {
        let mut patched = Vec::with_capacity(blocks.len());
        for block in blocks {
            if let Some(block) = self.patch_block(block)? {
                patched.push(block);
            }
        }
        Ok(patched)
    }

    fn patch_block(&self, block: Block) -> Result<Option<Block>, SyncError> {
        let patched = match block {
            Block::BulletedListItem(item) => self.patch_item(item)?.map(Block::BulletedListItem),
            Block::NumberedListItem(item) => self.patch_item(item)?.map(Block::NumberedListItem),
            Block::Code(code) => Some(Block::Code(patch_code(code))),
            Block::Paragraph(paragraph) => Some(self.patch_paragraph(paragraph)?),
            Block::ToDo(mut todo) => {
                todo.children = self.patch(todo.children)?;
                Some(Block::ToDo(todo))
            }
            Block::Quote(mut quote) => {
                quote.children = self.patch(quote.children)?;
                Some(Block::Quote(quote))
            }
            Block::Table(mut table) => {
                table.children = self.patch(table.children)?;
                Some(Block::Table(table))
            }
            other => Some(other),
        };
        Ok(patched)
    }

    fn patch_item(&self, mut item: ListItem) -> Result<Option<ListItem>, SyncError> {
        if plain_text(&item.rich_text).is_empty() {
            debug!("Dropping empty list item");
            return Ok(None);
        }
        item.children = self.patch(item.children)?;
        Ok(Some(item))
    }

    fn patch_paragraph(&self, paragraph: Paragraph) -> Result<Block, SyncError> {
        let text = plain_text(&paragraph.rich_text);
        match find_image_references(&text).next() {
            Some(reference) => Ok(Block::Image(self.image_block(reference)?)),
            None => Ok(Block::Paragraph(paragraph)),
        }
    }

    /// Build an image block, uploading the file first when the reference is local.
    pub fn image_block(&self, reference: ImageReference) -> Result<Image, SyncError> {
        let caption = image_caption(&reference);
        let source = if reference.is_local {
            let path = self.resolve(&reference.path);
            if !path.is_file() {
                return Err(SyncError::LocalImageNotFound(path));
            }
            let id = self.uploader.upload_file(&path)?;
            ImageSource::FileUpload { id }
        } else {
            ImageSource::External {
                url: reference.path,
            }
        };
        Ok(Image { source, caption })
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

fn patch_code(mut code: Code) -> Code {
    code.language = match code.language.as_deref().map(str::trim) {
        None | Some("") => Some(language::PLAIN_TEXT.to_string()),
        Some(lang) => {
            let lang = language::normalize(lang);
            if !language::is_supported(&lang) {
                debug!("Code language '{lang}' is not a known Notion language; passing it through");
            }
            Some(lang)
        }
    };
    code
}

/// Caption runs: the alt text, then the dimension note when either dimension is known.
pub fn image_caption(reference: &ImageReference) -> Vec<RichText> {
    let mut caption = Vec::new();
    if !reference.alt_text.is_empty() {
        caption.push(RichText::plain(reference.alt_text.clone()));
    }
    if let Some(note) = reference.dimension_note() {
        let note = if caption.is_empty() {
            note
        } else {
            format!(" {note}")
        };
        caption.push(RichText::plain(note));
    }
    caption
}
