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

//! Media extraction gateway.
//!
//! Layout: `extractor.rs` (blocking extraction contract and options),
//! `ytdlp.rs` (`yt-dlp` subprocess adapter), `pool.rs` (bounded offload onto the
//! blocking pool), `model.rs` (metadata), `classify.rs` (single vs collection).

pub mod classify;
pub mod error;
pub mod extractor;
pub mod model;
pub mod pool;
pub mod ytdlp;

pub use classify::{Classification, classify};
pub use error::{ExtractError, ExtractResult};
pub use extractor::{ExtractOptions, MediaExtractor};
pub use model::{Entry, Metadata};
pub use pool::{ExtractionPool, worker_deadline};
pub use ytdlp::YtDlpExtractor;
