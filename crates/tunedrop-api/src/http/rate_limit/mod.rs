//! Fixed-window admission gate and HTTP header helpers.
//!
//! # Design
//! - Counters live behind [`CounterStore`]: [`MemoryCounterStore`] for one
//!   process, [`RedisCounterStore`] when replicas share their windows.
//! - The gate only counts; it never inspects the request beyond the caller key.
//! - A store failure admits the request and is logged.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request, header::RETRY_AFTER},
    middleware::Next,
    response::Response,
};
use thiserror::Error;
use tracing::warn;

use crate::http::constants::{
    HEADER_FORWARDED_FOR, HEADER_RATE_LIMIT_LIMIT, HEADER_RATE_LIMIT_REMAINING,
    HEADER_RATE_LIMIT_RESET, UNKNOWN_CALLER,
};
use crate::http::errors::ApiError;
use crate::state::ApiState;

mod redis_store;

pub use redis_store::RedisCounterStore;

/// Result of counting one request against a caller's current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Requests counted in the current window, including this one.
    pub count: u32,
    /// Time until the current window closes.
    pub resets_in: Duration,
}

/// Failure reported by a counter backend.
#[derive(Debug, Error)]
pub enum CounterStoreError {
    /// Backend did not answer in time.
    #[error("rate limit store unavailable")]
    Unavailable {
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// Backend rejected the address or failed a command.
    #[error("rate limit store command failed")]
    Backend {
        /// Operation that failed.
        operation: &'static str,
        /// Underlying client error.
        #[source]
        source: redis::RedisError,
    },
}

/// Atomic increment-and-read over per-caller fixed windows.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Count one request for `key` in a window of length `window`.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be reached.
    async fn hit(&self, key: &str, window: Duration) -> Result<WindowHit, CounterStoreError>;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// In-process [`CounterStore`].
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    windows: Mutex<HashMap<String, Window>>,
}

impl MemoryCounterStore {
    const PRUNE_THRESHOLD: usize = 4096;

    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request for `key` as of `now`.
    #[must_use]
    pub fn hit_at(&self, key: &str, window: Duration, now: Instant) -> WindowHit {
        let mut guard = Self::lock_guard(&self.windows);
        if guard.len() >= Self::PRUNE_THRESHOLD {
            guard.retain(|_, entry| now.saturating_duration_since(entry.started) < window);
        }
        let entry = guard.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.saturating_duration_since(entry.started) >= window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }
        entry.count = entry.count.saturating_add(1);
        let hit = WindowHit {
            count: entry.count,
            resets_in: window.saturating_sub(now.saturating_duration_since(entry.started)),
        };
        drop(guard);
        hit
    }

    fn lock_guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn hit(&self, key: &str, window: Duration) -> Result<WindowHit, CounterStoreError> {
        Ok(self.hit_at(key, window, Instant::now()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RateLimitSnapshot {
    pub(crate) limit: u32,
    pub(crate) remaining: u32,
}

#[derive(Debug)]
pub(crate) struct RateLimitError {
    pub(crate) limit: u32,
    pub(crate) retry_after: Duration,
}

impl Display for RateLimitError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("rate limit exceeded")
    }
}

impl std::error::Error for RateLimitError {}

/// Admits at most `limit` requests per caller within each window.
#[derive(Clone)]
pub struct RateLimitGate {
    store: Arc<dyn CounterStore>,
    limit: u32,
    window: Duration,
    trust_forwarded_for: bool,
}

impl RateLimitGate {
    /// Create a gate over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CounterStore>, limit: u32, window: Duration) -> Self {
        Self {
            store,
            limit: limit.max(1),
            window,
            trust_forwarded_for: false,
        }
    }

    /// Identify callers by the first `X-Forwarded-For` hop when present.
    #[must_use]
    pub const fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub(crate) async fn check(&self, caller: &str) -> Result<RateLimitSnapshot, RateLimitError> {
        let hit = match self.store.hit(caller, self.window).await {
            Ok(hit) => hit,
            Err(err) => {
                warn!(error = ?err, "rate limit store failed; admitting request");
                return Ok(RateLimitSnapshot {
                    limit: self.limit,
                    remaining: self.limit,
                });
            }
        };
        if hit.count > self.limit {
            return Err(RateLimitError {
                limit: self.limit,
                retry_after: hit.resets_in,
            });
        }
        Ok(RateLimitSnapshot {
            limit: self.limit,
            remaining: self.limit - hit.count,
        })
    }

    pub(crate) fn caller_identity(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        if self.trust_forwarded_for
            && let Some(forwarded) = headers
                .get(HEADER_FORWARDED_FOR)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        {
            return forwarded.to_string();
        }
        peer.map_or_else(|| UNKNOWN_CALLER.to_string(), |addr| addr.ip().to_string())
    }
}

/// Route layer rejecting callers that exhausted their window.
pub(crate) async fn enforce_rate_limit(
    State(state): State<Arc<ApiState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(gate) = state.gate.as_ref() else {
        return Ok(next.run(req).await);
    };

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let caller = gate.caller_identity(req.headers(), peer);

    let snapshot = match gate.check(&caller).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            state.telemetry.inc_rate_limit_throttled();
            warn!(caller = %caller, "download rate limit exceeded");
            return Err(ApiError::too_many_requests(
                "Too many requests; try again later",
            )
            .with_rate_limit_headers(err.limit, 0, Some(err.retry_after)));
        }
    };

    let mut response = next.run(req).await;
    insert_rate_limit_headers(
        response.headers_mut(),
        snapshot.limit,
        snapshot.remaining,
        None,
    );
    Ok(response)
}

pub(crate) fn insert_rate_limit_headers(
    headers: &mut HeaderMap,
    limit: u32,
    remaining: u32,
    retry_after: Option<Duration>,
) {
    if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
        headers.insert(HEADER_RATE_LIMIT_LIMIT, value);
    }
    if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
        headers.insert(HEADER_RATE_LIMIT_REMAINING, value);
    }
    if let Some(wait) = retry_after {
        let secs = wait.as_secs();
        let seconds = if secs == 0 && wait.subsec_nanos() > 0 {
            1
        } else {
            secs.max(1)
        };
        let text = u32::try_from(seconds).unwrap_or(u32::MAX).to_string();
        if let Ok(value) = HeaderValue::from_str(&text) {
            headers.insert(RETRY_AFTER, value.clone());
            headers.insert(HEADER_RATE_LIMIT_RESET, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    #[async_trait]
    impl CounterStore for BrokenStore {
        async fn hit(&self, _key: &str, _window: Duration) -> Result<WindowHit, CounterStoreError> {
            Err(CounterStoreError::Unavailable {
                reason: "connect_timeout",
            })
        }
    }

    #[test]
    fn memory_store_resets_after_window() {
        let store = MemoryCounterStore::new();
        let window = Duration::from_secs(60);
        let start = Instant::now();

        for expected in 1..=6 {
            assert_eq!(store.hit_at("1.2.3.4", window, start).count, expected);
        }
        let later = store.hit_at("1.2.3.4", window, start + Duration::from_secs(30));
        assert_eq!(later.count, 7);
        assert_eq!(later.resets_in, Duration::from_secs(30));

        let reset = store.hit_at("1.2.3.4", window, start + Duration::from_secs(60));
        assert_eq!(reset.count, 1);
        assert_eq!(reset.resets_in, window);
        assert_eq!(store.hit_at("5.6.7.8", window, start).count, 1);
    }

    #[tokio::test]
    async fn gate_rejects_after_limit() {
        let gate = RateLimitGate::new(
            Arc::new(MemoryCounterStore::new()),
            5,
            Duration::from_secs(60),
        );
        for remaining in (0..5).rev() {
            let snapshot = gate.check("caller").await;
            assert_eq!(snapshot.ok().map(|s| s.remaining), Some(remaining));
        }
        let err = gate.check("caller").await;
        assert!(matches!(err, Err(RateLimitError { limit: 5, .. })));
        assert!(gate.check("other").await.is_ok());
    }

    #[tokio::test]
    async fn gate_admits_when_store_fails() {
        let gate = RateLimitGate::new(Arc::new(BrokenStore), 1, Duration::from_secs(60));
        assert!(gate.check("caller").await.is_ok());
        assert!(gate.check("caller").await.is_ok());
    }

    #[test]
    fn caller_identity_honours_forwarded_for_only_when_trusted() -> Result<(), Box<dyn std::error::Error>> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HEADER_FORWARDED_FOR,
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        let peer: SocketAddr = "192.0.2.1:5555".parse()?;
        let gate = RateLimitGate::new(
            Arc::new(MemoryCounterStore::new()),
            5,
            Duration::from_secs(60),
        );

        assert_eq!(gate.caller_identity(&headers, Some(peer)), "192.0.2.1");
        let trusting = gate.trust_forwarded_for(true);
        assert_eq!(trusting.caller_identity(&headers, Some(peer)), "203.0.113.9");
        assert_eq!(
            trusting.caller_identity(&HeaderMap::new(), None),
            UNKNOWN_CALLER
        );
        Ok(())
    }

    #[test]
    fn headers_round_up_sub_second_waits() {
        let mut headers = HeaderMap::new();
        insert_rate_limit_headers(&mut headers, 5, 0, Some(Duration::from_millis(200)));
        assert_eq!(
            headers.get(RETRY_AFTER).and_then(|v| v.to_str().ok()),
            Some("1")
        );
        assert_eq!(
            headers
                .get(HEADER_RATE_LIMIT_LIMIT)
                .and_then(|v| v.to_str().ok()),
            Some("5")
        );
    }
}
