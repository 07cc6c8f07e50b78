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

//! Shared helpers for Tunedrop test suites.

pub mod fixtures;
pub mod mocks;

pub use fixtures::{entry_count, scratch_dir};
pub use mocks::ScriptedExtractor;
