//! Error types for the conversion and sync pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while converting or syncing a document.
///
/// Image-reference misses, empty list items and unmatched rewrite keys are not errors;
/// they are ordinary branches of the best-effort stages and never surface here.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A local file (document, mapping, image) could not be read
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rewrite mapping file is neither a flat nor a per-document mapping
    #[error("failed to decode rewrite mapping '{}' as single or multi-document mapping", path.display())]
    MappingDecode { path: PathBuf },

    /// The Markdown adapter rejected the document
    #[error("markdown conversion failed: {0}")]
    Markdown(String),

    /// A local image referenced by the document does not exist
    #[error("local image file not found: {}", .0.display())]
    LocalImageNotFound(PathBuf),

    /// The target page has no property typed as `title`
    #[error("no title property found on page {page_id}")]
    MissingTitleProperty { page_id: String },

    /// The remote service answered with a non-success status
    #[error("Notion API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Transport-level failure talking to the remote service
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The token or API version cannot be sent as a header
    #[error("invalid request header: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    /// A request or response body could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No integration token was supplied
    #[error("no Notion integration token provided")]
    MissingToken,
}

impl SyncError {
    /// Whether retrying the same request may succeed.
    ///
    /// Rate limiting (429), server errors (5xx) and transport timeouts or connection
    /// failures are transient; everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Api { status, .. } => *status == 429 || *status >= 500,
            SyncError::Http(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }

    /// Whether the failure shows the service never acted on the request.
    ///
    /// Only rate limiting (429) and failures to connect qualify. A timeout or a 5xx may
    /// arrive after the change was applied.
    pub fn is_unprocessed(&self) -> bool {
        match self {
            SyncError::Api { status, .. } => *status == 429,
            SyncError::Http(err) => err.is_connect(),
            _ => false,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }
}
