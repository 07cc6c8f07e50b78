//! Shared HTTP constants (headers, problem URIs, media types).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const HEADER_FORWARDED_FOR: &str = "x-forwarded-for";
pub(crate) const HEADER_RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub(crate) const HEADER_RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub(crate) const HEADER_RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

pub(crate) const PROBLEM_INTERNAL: &str = "https://tunedrop.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://tunedrop.dev/problems/bad-request";
pub(crate) const PROBLEM_RATE_LIMITED: &str = "https://tunedrop.dev/problems/rate-limited";
pub(crate) const PROBLEM_EXTRACTION_FAILED: &str =
    "https://tunedrop.dev/problems/extraction-failed";

pub(crate) const CONTENT_TYPE_MP3: &str = "audio/mpeg";
pub(crate) const CONTENT_TYPE_ZIP: &str = "application/zip";
pub(crate) const CONTENT_TYPE_METRICS: &str = "text/plain; version=0.0.4";
pub(crate) const AUDIO_EXTENSION: &str = "mp3";
pub(crate) const DEFAULT_COLLECTION_TITLE: &str = "playlist";
pub(crate) const UNKNOWN_CALLER: &str = "unknown";
