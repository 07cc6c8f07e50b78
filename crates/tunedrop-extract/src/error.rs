//! # Design
//!
//! - Constant-message errors with structured context, one enum for every
//!   extraction failure so callers can treat them as a single failure path.
//! - [`ExtractError::summary`] renders a short caller-safe description.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Errors produced while extracting media.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The extractor binary could not be launched.
    #[error("failed to launch extractor")]
    Spawn {
        /// Program that failed to start.
        program: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// IO failure while talking to the extractor process.
    #[error("extractor io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The extractor exited with a non-zero status.
    #[error("extractor exited unsuccessfully")]
    Exited {
        /// Exit code when the process was not killed by a signal.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
    /// The extractor produced metadata that could not be parsed.
    #[error("extractor returned malformed metadata")]
    Metadata {
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// The extraction did not finish before its deadline.
    #[error("extraction timed out")]
    TimedOut {
        /// Operation that exceeded the deadline.
        operation: &'static str,
        /// Deadline that was exceeded.
        timeout: Duration,
    },
    /// The blocking worker running the extraction failed.
    #[error("extraction worker failed")]
    Worker {
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
    /// The extraction pool no longer accepts work.
    #[error("extraction pool closed")]
    PoolClosed,
}

impl ExtractError {
    /// Short description suitable for an HTTP problem detail.
    ///
    /// Non-zero exits report the last line the tool wrote to stderr.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Exited { code, stderr } => stderr
                .lines()
                .map(str::trim)
                .rfind(|line| !line.is_empty())
                .map_or_else(
                    || match code {
                        Some(code) => format!("{self} (exit code {code})"),
                        None => format!("{self} (terminated)"),
                    },
                    ToString::to_string,
                ),
            Self::TimedOut { timeout, .. } => {
                format!("{self} after {}s", timeout.as_secs())
            }
            _ => self.to_string(),
        }
    }
}
