//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers produced by the loader and consumed during bootstrap.
//! - Every field has a default so an empty environment yields a working service.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::defaults;
use crate::error::ConfigError;

/// Complete service configuration.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Listener settings.
    pub server: ServerConfig,
    /// Scratch storage settings.
    pub storage: StorageConfig,
    /// Logging output settings.
    pub logging: LoggingSettings,
    /// Admission gate settings.
    pub rate_limit: RateLimitConfig,
    /// Extraction pool and external tool settings.
    pub extraction: ExtractionConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface the API binds to.
    pub bind_addr: IpAddr,
    /// Port the API binds to.
    pub http_port: u16,
}

impl ServerConfig {
    /// Socket address derived from the bind address and port.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }
}

/// Scratch storage settings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Base directory under which request workspaces are allocated.
    pub download_dir: PathBuf,
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Optional file that receives a copy of every log line.
    pub file: Option<PathBuf>,
    /// Explicit log format (`json` or `pretty`); inferred when absent.
    pub format: Option<String>,
}

/// Backends able to hold the admission counters.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitBackend {
    /// Counters held in process memory.
    Memory,
    /// Counters shared through a Redis server, so every replica sees the same windows.
    Redis,
}

impl FromStr for RateLimitBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            _ => Err(ConfigError::UnsupportedBackend {
                value: value.to_string(),
            }),
        }
    }
}

/// Admission gate settings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Whether the gate is consulted at all.
    pub enabled: bool,
    /// Counter store backend.
    pub backend: RateLimitBackend,
    /// Address of the shared counter store; unused by the memory backend.
    pub url: String,
    /// Requests admitted per caller within one window.
    pub times: u32,
    /// Window length.
    pub window: Duration,
    /// Use the first `X-Forwarded-For` hop as the caller identity.
    pub trust_forwarded_for: bool,
}

/// Extraction pool and external tool settings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExtractionConfig {
    /// Number of extraction calls allowed to run concurrently.
    pub worker_pool_size: usize,
    /// Deadline for a single offloaded extraction call.
    pub timeout: Duration,
    /// Path or name of the media retrieval binary.
    pub ytdlp_bin: PathBuf,
    /// Optional location of the transcoder binaries.
    pub ffmpeg_location: Option<PathBuf>,
    /// Maximum number of tracks packaged into one archive.
    pub max_playlist_tracks: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
                http_port: defaults::HTTP_PORT,
            },
            storage: StorageConfig {
                download_dir: PathBuf::from(defaults::DOWNLOAD_DIR),
            },
            logging: LoggingSettings {
                file: Some(PathBuf::from(defaults::LOG_FILE)),
                format: None,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                backend: RateLimitBackend::Memory,
                url: defaults::RATE_LIMIT_URL.to_string(),
                times: defaults::RATE_LIMIT_TIMES,
                window: Duration::from_secs(defaults::RATE_LIMIT_SECONDS),
                trust_forwarded_for: false,
            },
            extraction: ExtractionConfig {
                worker_pool_size: defaults::WORKER_POOL_SIZE,
                timeout: Duration::from_secs(defaults::EXTRACTION_TIMEOUT_SECS),
                ytdlp_bin: PathBuf::from(defaults::YTDLP_BIN),
                ffmpeg_location: None,
                max_playlist_tracks: defaults::MAX_PLAYLIST_TRACKS,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.socket_addr().to_string(), "127.0.0.1:8000");
        assert_eq!(config.rate_limit.times, 5);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.rate_limit.backend, RateLimitBackend::Memory);
        assert_eq!(config.rate_limit.url, "redis://localhost:6379");
        assert_eq!(config.extraction.worker_pool_size, 5);
        assert_eq!(config.extraction.max_playlist_tracks, 50);
        assert_eq!(defaults::BIND_ADDR, "127.0.0.1");
    }

    #[test]
    fn backend_parses_known_names_and_rejects_others() {
        assert_eq!(
            "Memory".parse::<RateLimitBackend>().ok(),
            Some(RateLimitBackend::Memory)
        );
        assert_eq!(
            " redis ".parse::<RateLimitBackend>().ok(),
            Some(RateLimitBackend::Redis)
        );
        assert!(matches!(
            "redis://localhost:6379".parse::<RateLimitBackend>(),
            Err(ConfigError::UnsupportedBackend { .. })
        ));
    }
}
