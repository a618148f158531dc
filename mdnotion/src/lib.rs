//! Markdown to Notion block conversion and page sync
//!
//! This crate turns a Markdown document into Notion's block representation and writes it to
//! a page, skipping the write when nothing changed since the last run.
//!
//! This is a pure lib, that is, it powers mdnotion-cli but is shell agnostic: no code here
//! prints, reads env vars or exits. Logging goes through the `log` facade and the binary
//! decides where it ends up.
//!
//! Architecture
//!
//! ```text
//! raw text → rewrite → markdown → patch → title → hash gate → remote writes
//!
//! .
//! ├── error.rs            # SyncError
//! ├── blocks              # Block model + wire serialization, language table
//! ├── markdown            # Converter trait, comrak adapter
//! ├── images.rs           # Image reference extraction
//! ├── patch.rs            # Block validation/repair, image blocks
//! ├── rewrite.rs          # Literal rewrite mapping
//! ├── hash.rs             # Content hash + metadata block
//! ├── title.rs            # Title extraction
//! ├── remote              # API traits, HTTP client, MIME detection
//! └── sync.rs             # Pipeline state machine
//! ```
//!
//! Every stage before the remote writes is a plain function over owned values and can be
//! tested without a network. The remote side is behind the traits in [`remote`], which the
//! integration tests implement with an in-memory page.
//!
//! Library Choices
//!
//! comrak parses Markdown, reqwest (blocking) talks HTTP, sha2 hashes, serde_json handles
//! the wire format. We never hand-roll a Markdown parser: the adapter only maps comrak's AST
//! onto blocks.
//!
pub mod blocks;
pub mod error;
pub mod hash;
pub mod images;
pub mod markdown;
pub mod patch;
pub mod remote;
pub mod rewrite;
pub mod sync;
pub mod title;

pub use blocks::Block;
pub use error::SyncError;
pub use markdown::{Converter, MarkdownConverter};
pub use remote::{DryRunUploader, FileUploader, NotionApi, NotionClient, NotionSettings};
pub use sync::{
    HashOptions, HashStore, HashWriteOrder, Pipeline, PipelineError, SyncMode, SyncOptions,
    SyncReport, SyncState,
};
