//! Literal text rewriting applied to the source before conversion.
//!
//! A mapping file is JSON in one of two shapes:
//!
//! ```json
//! {"old text": "new text"}
//! ```
//!
//! applies to every document, while
//!
//! ```json
//! {"docs/a.md": {"old text": "new text"}}
//! ```
//!
//! scopes replacements to documents whose path contains the key.
//!
//! Keys are kept in a `BTreeMap`, so both the per-document key lookup and the replacement order
//! are lexicographic. Overlapping old-text keys still interact, and callers should not rely on
//! any particular priority between them.

use crate::error::SyncError;
use log::debug;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Flat `old-text -> new-text` table.
pub type Replacements = BTreeMap<String, String>;

/// A decoded rewrite mapping file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteMapping {
    /// Applies to every document
    Single(Replacements),
    /// Keyed by a path fragment matched against the document path
    PerDocument(BTreeMap<String, Replacements>),
}

impl RewriteMapping {
    /// Decode a mapping, trying the flat shape first and the per-document shape second.
    pub fn from_json(data: &[u8]) -> Option<Self> {
        if let Ok(single) = serde_json::from_slice::<Replacements>(data) {
            return Some(RewriteMapping::Single(single));
        }
        serde_json::from_slice::<BTreeMap<String, Replacements>>(data)
            .ok()
            .map(RewriteMapping::PerDocument)
    }

    /// Read and decode a mapping file. Undecodable content is a configuration error.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let data = fs::read(path).map_err(|e| SyncError::io(path, e))?;
        let mapping = Self::from_json(&data).ok_or_else(|| SyncError::MappingDecode {
            path: path.to_path_buf(),
        })?;
        match &mapping {
            RewriteMapping::Single(map) => {
                debug!("Detected single-page rewrite mapping with {} entries", map.len())
            }
            RewriteMapping::PerDocument(map) => {
                debug!("Detected multi-page rewrite mapping with {} page keys", map.len())
            }
        }
        Ok(mapping)
    }

    /// The replacements that apply to the document at `document_path`, if any.
    pub fn resolve(&self, document_path: &str) -> Option<&Replacements> {
        match self {
            RewriteMapping::Single(map) => Some(map),
            RewriteMapping::PerDocument(pages) => {
                let found = pages
                    .iter()
                    .find(|(key, _)| document_path.contains(key.as_str()));
                match found {
                    Some((key, map)) => {
                        debug!(
                            "Found {} replacements for page key '{key}' (matched in: {document_path})",
                            map.len()
                        );
                        Some(map)
                    }
                    None => {
                        debug!("No mapping key matches '{document_path}'. No rewrite applied.");
                        None
                    }
                }
            }
        }
    }

    /// Rewrite `content` for the document at `document_path`.
    ///
    /// Returns the input unchanged when no per-document key matches.
    pub fn apply(&self, content: &str, document_path: &str) -> String {
        match self.resolve(document_path) {
            Some(replacements) => apply_replacements(content, replacements),
            None => content.to_string(),
        }
    }
}

/// Replace every occurrence of each key with its value.
pub fn apply_replacements(content: &str, replacements: &Replacements) -> String {
    let mut rewritten = content.to_string();
    for (old, new) in replacements {
        debug!("Replacing '{old}' -> '{new}'");
        rewritten = rewritten.replace(old.as_str(), new);
    }
    rewritten
}

/// Load the mapping at `mapping_path` and apply it to `content`.
pub fn rewrite(content: &str, document_path: &Path, mapping_path: &Path) -> Result<String, SyncError> {
    let mapping = RewriteMapping::load(mapping_path)?;
    Ok(mapping.apply(content, &document_path.to_string_lossy()))
}
