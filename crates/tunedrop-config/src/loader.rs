//! Environment loader for [`ServiceConfig`].
//!
//! # Design
//! - Parsing runs over an injected key lookup so tests never mutate the process
//!   environment.
//! - Unset or blank variables keep their defaults; malformed ones fail loudly.

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::ConfigResult;
use crate::model::{RateLimitBackend, ServiceConfig};
use crate::validate::{
    parse_flag, parse_ip, parse_port, parse_positive_u32, parse_positive_u64,
    parse_positive_usize, parse_store_url,
};

const BIND_ADDR: &str = "TUNEDROP_BIND_ADDR";
const HTTP_PORT: &str = "TUNEDROP_HTTP_PORT";
const DOWNLOAD_DIR: &str = "TUNEDROP_DOWNLOAD_DIR";
const LOG_FILE: &str = "TUNEDROP_LOG_FILE";
const LOG_FORMAT: &str = "TUNEDROP_LOG_FORMAT";
const RATE_LIMIT_BACKEND: &str = "TUNEDROP_RATE_LIMIT_BACKEND";
const RATE_LIMIT_URL: &str = "TUNEDROP_RATE_LIMIT_URL";
const RATE_LIMIT_ENABLED: &str = "TUNEDROP_RATE_LIMIT_ENABLED";
const RATE_LIMIT_TIMES: &str = "TUNEDROP_RATE_LIMIT_TIMES";
const RATE_LIMIT_SECONDS: &str = "TUNEDROP_RATE_LIMIT_SECONDS";
const TRUST_FORWARDED_FOR: &str = "TUNEDROP_TRUST_FORWARDED_FOR";
const WORKER_POOL_SIZE: &str = "TUNEDROP_WORKER_POOL_SIZE";
const MAX_PLAYLIST_TRACKS: &str = "TUNEDROP_MAX_PLAYLIST_TRACKS";
const EXTRACTION_TIMEOUT_SECS: &str = "TUNEDROP_EXTRACTION_TIMEOUT_SECS";
const YTDLP_BIN: &str = "TUNEDROP_YTDLP_BIN";
const FFMPEG_LOCATION: &str = "TUNEDROP_FFMPEG_LOCATION";

/// Load the service configuration from the process environment.
///
/// # Errors
///
/// Returns an error when any recognised variable holds an invalid value.
pub fn load_from_env() -> ConfigResult<ServiceConfig> {
    load_from_lookup(|key| std::env::var(key).ok())
}

/// Load the service configuration from an arbitrary key lookup.
///
/// # Errors
///
/// Returns an error when any recognised variable holds an invalid value.
pub fn load_from_lookup<F>(lookup: F) -> ConfigResult<ServiceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
    let mut config = ServiceConfig::default();

    if let Some(value) = get(BIND_ADDR) {
        config.server.bind_addr = parse_ip(BIND_ADDR, &value)?;
    }
    if let Some(value) = get(HTTP_PORT) {
        config.server.http_port = parse_port(HTTP_PORT, &value)?;
    }
    if let Some(value) = get(DOWNLOAD_DIR) {
        config.storage.download_dir = PathBuf::from(value);
    }
    // An explicitly empty log file disables file output.
    if let Some(value) = lookup(LOG_FILE) {
        config.logging.file = Some(value)
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
    }
    if let Some(value) = get(LOG_FORMAT) {
        config.logging.format = Some(value.trim().to_ascii_lowercase());
    }

    if let Some(value) = get(RATE_LIMIT_BACKEND) {
        config.rate_limit.backend = value.parse::<RateLimitBackend>()?;
    }
    if let Some(value) = get(RATE_LIMIT_URL) {
        config.rate_limit.url = parse_store_url(RATE_LIMIT_URL, &value)?;
    }
    if let Some(value) = get(RATE_LIMIT_ENABLED) {
        config.rate_limit.enabled = parse_flag(RATE_LIMIT_ENABLED, &value)?;
    }
    if let Some(value) = get(RATE_LIMIT_TIMES) {
        config.rate_limit.times = parse_positive_u32(RATE_LIMIT_TIMES, &value)?;
    }
    if let Some(value) = get(RATE_LIMIT_SECONDS) {
        config.rate_limit.window =
            Duration::from_secs(parse_positive_u64(RATE_LIMIT_SECONDS, &value)?);
    }
    if let Some(value) = get(TRUST_FORWARDED_FOR) {
        config.rate_limit.trust_forwarded_for = parse_flag(TRUST_FORWARDED_FOR, &value)?;
    }

    if let Some(value) = get(WORKER_POOL_SIZE) {
        config.extraction.worker_pool_size = parse_positive_usize(WORKER_POOL_SIZE, &value)?;
    }
    if let Some(value) = get(MAX_PLAYLIST_TRACKS) {
        config.extraction.max_playlist_tracks =
            parse_positive_usize(MAX_PLAYLIST_TRACKS, &value)?;
    }
    if let Some(value) = get(EXTRACTION_TIMEOUT_SECS) {
        config.extraction.timeout =
            Duration::from_secs(parse_positive_u64(EXTRACTION_TIMEOUT_SECS, &value)?);
    }
    if let Some(value) = get(YTDLP_BIN) {
        config.extraction.ytdlp_bin = PathBuf::from(value);
    }
    if let Some(value) = get(FFMPEG_LOCATION) {
        config.extraction.ffmpeg_location = Some(PathBuf::from(value));
    }

    debug!(
        download_dir = %config.storage.download_dir.display(),
        worker_pool_size = config.extraction.worker_pool_size,
        rate_limit_enabled = config.rate_limit.enabled,
        rate_limit_backend = ?config.rate_limit.backend,
        "configuration loaded"
    );
    Ok(config)
}
