//! In-memory Notion page used by the integration tests.

use mdnotion::remote::{BlockStore, ChildrenPage, FileUploader, PageProperties, RemoteBlock};
use mdnotion::{Block, SyncError};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Children returned per listing request, small enough to force pagination.
const PAGE_SIZE: usize = 2;

/// Remote calls in the order they were made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(Option<String>),
    Delete(String),
    Append(usize),
    GetProperty(String),
    SetProperty(String, String),
    UpdateTitle(String),
    Upload(PathBuf),
}

pub struct FakeNotion {
    pub children: RefCell<Vec<RemoteBlock>>,
    pub properties: RefCell<BTreeMap<String, String>>,
    pub title_property: Option<String>,
    pub title: RefCell<Option<String>>,
    pub calls: RefCell<Vec<Call>>,
    pub fail_set_property: bool,
    pub fail_append: bool,
    pub next_id: Cell<usize>,
}

impl Default for FakeNotion {
    fn default() -> Self {
        FakeNotion {
            children: RefCell::new(Vec::new()),
            properties: RefCell::new(BTreeMap::new()),
            title_property: Some("Name".to_string()),
            title: RefCell::new(None),
            calls: RefCell::new(Vec::new()),
            fail_set_property: false,
            fail_append: false,
            next_id: Cell::new(0),
        }
    }
}

impl FakeNotion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the page with paragraphs.
    pub fn with_paragraphs(self, texts: &[&str]) -> Self {
        let blocks: Vec<Block> = texts.iter().map(|t| Block::paragraph(*t)).collect();
        self.store(&blocks);
        self
    }

    pub fn with_property(self, name: &str, value: &str) -> Self {
        self.properties
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Whether any call changed the page.
    pub fn mutated(&self) -> bool {
        self.calls.borrow().iter().any(|call| {
            matches!(
                call,
                Call::Delete(_) | Call::Append(_) | Call::SetProperty(..) | Call::UpdateTitle(_)
            )
        })
    }

    pub fn child_kinds(&self) -> Vec<String> {
        self.children.borrow().iter().map(|b| b.kind.clone()).collect()
    }

    pub fn child_texts(&self) -> Vec<String> {
        self.children
            .borrow()
            .iter()
            .map(RemoteBlock::plain_text)
            .collect()
    }

    fn store(&self, blocks: &[Block]) {
        for block in blocks {
            let id = self.next_id.get() + 1;
            self.next_id.set(id);
            let mut value = serde_json::to_value(block).unwrap();
            value["id"] = json!(format!("blk-{id}"));
            let remote: RemoteBlock = serde_json::from_value(value).unwrap();
            self.children.borrow_mut().push(remote);
        }
    }
}

impl BlockStore for FakeNotion {
    fn list_children(
        &self,
        _block_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChildrenPage, SyncError> {
        self.calls
            .borrow_mut()
            .push(Call::List(cursor.map(str::to_string)));
        let start = cursor.map(|c| c.parse::<usize>().unwrap()).unwrap_or(0);
        let children = self.children.borrow();
        let end = (start + PAGE_SIZE).min(children.len());
        let has_more = end < children.len();
        Ok(ChildrenPage {
            results: children[start..end].to_vec(),
            next_cursor: has_more.then(|| end.to_string()),
            has_more,
        })
    }

    fn delete_block(&self, block_id: &str) -> Result<(), SyncError> {
        self.calls
            .borrow_mut()
            .push(Call::Delete(block_id.to_string()));
        self.children.borrow_mut().retain(|b| b.id != block_id);
        Ok(())
    }

    fn append_children(&self, _block_id: &str, blocks: &[Block]) -> Result<(), SyncError> {
        self.calls.borrow_mut().push(Call::Append(blocks.len()));
        if self.fail_append {
            return Err(SyncError::Api {
                status: 400,
                body: "validation_error".to_string(),
            });
        }
        self.store(blocks);
        Ok(())
    }
}

impl PageProperties for FakeNotion {
    fn get_property(&self, _page_id: &str, name: &str) -> Result<Option<String>, SyncError> {
        self.calls
            .borrow_mut()
            .push(Call::GetProperty(name.to_string()));
        Ok(self
            .properties
            .borrow()
            .get(name)
            .filter(|v| !v.is_empty())
            .cloned())
    }

    fn set_property(&self, _page_id: &str, name: &str, value: &str) -> Result<(), SyncError> {
        self.calls
            .borrow_mut()
            .push(Call::SetProperty(name.to_string(), value.to_string()));
        if self.fail_set_property {
            return Err(SyncError::Api {
                status: 409,
                body: "conflict_error".to_string(),
            });
        }
        self.properties
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn update_title(&self, page_id: &str, title: &str) -> Result<(), SyncError> {
        self.calls
            .borrow_mut()
            .push(Call::UpdateTitle(title.to_string()));
        if self.title_property.is_none() {
            return Err(SyncError::MissingTitleProperty {
                page_id: page_id.to_string(),
            });
        }
        *self.title.borrow_mut() = Some(title.to_string());
        Ok(())
    }
}

impl FileUploader for FakeNotion {
    fn upload_file(&self, path: &Path) -> Result<String, SyncError> {
        self.calls.borrow_mut().push(Call::Upload(path.to_path_buf()));
        Ok("upload-1".to_string())
    }
}

/// Path of a fixture under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Write `content` to `name` inside `dir` and return the path.
pub fn write_doc(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}
