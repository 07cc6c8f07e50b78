//! Baseline values applied when the environment does not override them.

/// Loopback bind address used unless `TUNEDROP_BIND_ADDR` is set.
pub const BIND_ADDR: &str = "127.0.0.1";
/// HTTP port for the API listener.
pub const HTTP_PORT: u16 = 8000;
/// Scratch directory holding per-request workspaces.
pub const DOWNLOAD_DIR: &str = "./temp_downloads";
/// Log file appended to alongside stdout logging.
pub const LOG_FILE: &str = "./logs/downloader.log";
/// Requests admitted per caller within one window.
pub const RATE_LIMIT_TIMES: u32 = 5;
/// Address of the shared counter store used by the `redis` backend.
pub const RATE_LIMIT_URL: &str = "redis://localhost:6379";
/// Length of the admission window in seconds.
pub const RATE_LIMIT_SECONDS: u64 = 60;
/// Concurrent extraction workers.
pub const WORKER_POOL_SIZE: usize = 5;
/// Maximum tracks packaged into a collection archive.
pub const MAX_PLAYLIST_TRACKS: usize = 50;
/// Upper bound on a single offloaded extraction call.
pub const EXTRACTION_TIMEOUT_SECS: u64 = 600;
/// Media retrieval binary looked up on `PATH`.
pub const YTDLP_BIN: &str = "yt-dlp";
