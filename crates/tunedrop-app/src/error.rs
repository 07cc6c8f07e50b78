//! # Design
//!
//! - Centralize application-level errors for bootstrap and shutdown.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: tunedrop_config::ConfigError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: tunedrop_api::ApiServerError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: tunedrop_telemetry::TelemetryError,
    },
    /// The rate-limit counter store could not be set up.
    #[error("rate limit store operation failed")]
    RateLimit {
        /// Operation identifier.
        operation: &'static str,
        /// Source counter store error.
        source: tunedrop_api::CounterStoreError,
    },
    /// Scratch storage operations failed.
    #[error("scratch storage operation failed")]
    FsOps {
        /// Operation identifier.
        operation: &'static str,
        /// Source fsops error.
        source: tunedrop_fsops::FsOpsError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: tunedrop_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: tunedrop_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: tunedrop_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn rate_limit(
        operation: &'static str,
        source: tunedrop_api::CounterStoreError,
    ) -> Self {
        Self::RateLimit { operation, source }
    }

    pub(crate) const fn fsops(operation: &'static str, source: tunedrop_fsops::FsOpsError) -> Self {
        Self::FsOps { operation, source }
    }
}
