//! HTTP surface modules (router, handlers, admission gate, middleware).

/// Streaming body that releases the request workspace.
pub(crate) mod body;
/// Shared constants and header names.
pub(crate) mod constants;
/// Download handlers.
pub(crate) mod download;
/// Problem response helpers.
pub(crate) mod errors;
/// Liveness and metrics endpoints.
pub(crate) mod health;
/// Per-caller admission gate.
pub mod rate_limit;
/// Router construction and server host.
pub mod router;
/// Metrics middleware for HTTP requests.
pub(crate) mod telemetry;
