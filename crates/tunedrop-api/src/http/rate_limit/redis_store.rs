//! Redis-backed [`CounterStore`] shared by every service replica.
//!
//! # Design
//! - One server-side script increments the caller's counter, arms its expiry on
//!   the first hit and reads the remaining TTL, so each window is atomic.
//! - The multiplexed connection is opened on first use and dropped after a
//!   failure; the next request reconnects.
//! - Connects and commands share one deadline so a stalled server degrades to
//!   the gate's fail-open path instead of blocking downloads.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisResult, Script};
use tokio::sync::Mutex;
use tokio::time::error::Elapsed;
use tracing::{debug, info};

use super::{CounterStore, CounterStoreError, WindowHit};

const KEY_PREFIX: &str = "tunedrop:ratelimit:";
const STORE_TIMEOUT: Duration = Duration::from_secs(2);
const HIT_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {count, ttl}
";

/// Fixed-window counters kept in Redis under `tunedrop:ratelimit:<caller>`.
pub struct RedisCounterStore {
    client: Client,
    script: Script,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl RedisCounterStore {
    /// Prepare a store for `url` without connecting.
    ///
    /// # Errors
    ///
    /// Returns [`CounterStoreError::Backend`] when the address is not a valid
    /// Redis URL.
    pub fn open(url: &str) -> Result<Self, CounterStoreError> {
        let client = Client::open(url).map_err(|source| CounterStoreError::Backend {
            operation: "redis.open",
            source,
        })?;
        Ok(Self {
            client,
            script: Script::new(HIT_SCRIPT),
            connection: Mutex::new(None),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CounterStoreError> {
        let mut slot = self.connection.lock().await;
        if let Some(connection) = slot.as_ref() {
            return Ok(connection.clone());
        }
        let connection =
            tokio::time::timeout(STORE_TIMEOUT, self.client.get_multiplexed_async_connection())
                .await
                .map_err(|_| CounterStoreError::Unavailable {
                    reason: "connect_timeout",
                })?
                .map_err(|source| CounterStoreError::Backend {
                    operation: "redis.connect",
                    source,
                })?;
        info!("rate limit store connected");
        *slot = Some(connection.clone());
        drop(slot);
        Ok(connection)
    }

    async fn forget_connection(&self) {
        if self.connection.lock().await.take().is_some() {
            debug!("rate limit store connection dropped");
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn hit(&self, key: &str, window: Duration) -> Result<WindowHit, CounterStoreError> {
        let mut connection = self.connection().await?;
        let mut invocation = self.script.key(counter_key(key));
        invocation.arg(window_millis(window));

        let reply: Result<RedisResult<(i64, i64)>, Elapsed> =
            tokio::time::timeout(STORE_TIMEOUT, invocation.invoke_async(&mut connection)).await;
        match reply {
            Ok(Ok((count, ttl_ms))) => Ok(window_hit(count, ttl_ms, window)),
            Ok(Err(source)) => {
                self.forget_connection().await;
                Err(CounterStoreError::Backend {
                    operation: "redis.hit",
                    source,
                })
            }
            Err(_) => {
                self.forget_connection().await;
                Err(CounterStoreError::Unavailable {
                    reason: "command_timeout",
                })
            }
        }
    }
}

fn counter_key(caller: &str) -> String {
    format!("{KEY_PREFIX}{caller}")
}

fn window_millis(window: Duration) -> u64 {
    u64::try_from(window.as_millis())
        .unwrap_or(u64::MAX)
        .max(1)
}

fn window_hit(count: i64, ttl_ms: i64, window: Duration) -> WindowHit {
    let count = u32::try_from(count.max(0)).unwrap_or(u32::MAX);
    let resets_in = u64::try_from(ttl_ms)
        .ok()
        .filter(|millis| *millis > 0)
        .map_or(window, Duration::from_millis)
        .min(window);
    WindowHit { count, resets_in }
}
