//! Wire payloads returned by the HTTP surface.

use serde::{Deserialize, Serialize};

/// RFC9457-compatible problem document returned on failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// Problem type URI.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short summary of the problem category.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Caller facing description of this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Liveness payload served by `/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    /// Always `running` while the process serves requests.
    pub status: String,
}
