#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Filesystem operations backing a download request.
//!
//! Layout: `sanitize.rs` (download names and header values), `workspace.rs`
//! (per-request scratch directories), `archive.rs` (collection packaging),
//! `error.rs` (error types).

pub mod archive;
pub mod error;
pub mod sanitize;
pub mod workspace;

pub use archive::{ArchiveAssembler, ArchiveReport};
pub use error::{FsOpsError, FsOpsResult};
pub use sanitize::{
    MAX_FILENAME_LEN, archive_stem, content_disposition, encode_filename, sanitize,
    sanitize_file_name, sanitize_or,
};
pub use workspace::{Workspace, WorkspaceManager};
