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

//! Environment-backed configuration for the Tunedrop service.
//!
//! Layout: `model.rs` (typed settings), `loader.rs` (environment parsing),
//! `validate.rs` (field parsers), `defaults.rs` (baseline values).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_from_env, load_from_lookup};
pub use model::{
    ExtractionConfig, LoggingSettings, RateLimitBackend, RateLimitConfig, ServerConfig,
    ServiceConfig, StorageConfig,
};
