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

//! HTTP surface and request orchestration for Tunedrop.
//!
//! Layout: `orchestrator.rs` (single and collection flows), `state.rs` (shared
//! handler state), `http/` (router, handlers, admission gate, middleware),
//! `models.rs` (wire payloads), `error.rs` (server errors).

pub mod error;
pub mod http;
pub mod models;
pub mod orchestrator;
pub mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::rate_limit::{
    CounterStore, CounterStoreError, MemoryCounterStore, RateLimitGate, RedisCounterStore,
    WindowHit,
};
pub use http::router::ApiServer;
pub use orchestrator::{Artifact, DownloadError, DownloadOrchestrator};
pub use state::ApiState;
