//! Rate-limit window storage backends

use crate::config::SecretString;
use crate::domain::{FileGuardError, Result};
use async_trait::async_trait;
use redis::Script;
use secrecy::ExposeSecret;
use tracing::debug;

/// Atomic sliding-window maintenance script
///
/// In one round trip: drop entries older than the window, admit the new
/// request, count the window, refresh the key TTL, and report the oldest
/// surviving entry's timestamp (used to compute when the window resets).
const SLIDING_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local now_ms = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])
local member = ARGV[3]
redis.call('ZREMRANGEBYSCORE', key, 0, now_ms - window_ms)
redis.call('ZADD', key, now_ms, member)
local count = redis.call('ZCARD', key)
redis.call('EXPIRE', key, math.ceil(window_ms / 1000))
local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
local oldest_ms = now_ms
if oldest[2] then
    oldest_ms = tonumber(oldest[2])
end
return {count, tostring(oldest_ms)}
"#;

/// Snapshot of one tenant's request window after admitting a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSample {
    /// Requests in the window, including the one just admitted
    pub count: u64,
    /// Timestamp (ms) of the oldest request still in the window
    pub oldest_ms: u64,
}

/// Storage boundary for the sliding-window limiter
///
/// Implementations must admit the request and report the resulting
/// window state atomically.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Admit `member` into the window behind `key` and sample the window
    async fn admit(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
        member: &str,
    ) -> Result<WindowSample>;
}

/// Redis-backed window store
///
/// Holds a connectionless client; connections are established per call
/// through the multiplexed pool. The connection URL is held as a secret
/// because it commonly embeds credentials.
pub struct RedisStore {
    client: redis::Client,
    script: Script,
}

impl RedisStore {
    /// Create a store from a Redis connection URL
    pub fn new(redis_url: &SecretString) -> Result<Self> {
        let client = redis::Client::open(redis_url.expose_secret().as_ref())
            .map_err(|err| FileGuardError::RateLimit(format!("invalid Redis URL: {err}")))?;
        Ok(Self {
            client,
            script: Script::new(SLIDING_WINDOW_SCRIPT),
        })
    }
}

#[async_trait]
impl RateLimitStore for RedisStore {
    async fn admit(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
        member: &str,
    ) -> Result<WindowSample> {
        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|err| FileGuardError::RateLimit(format!("Redis connection failed: {err}")))?;

        let (count, oldest_ms): (u64, u64) = self
            .script
            .key(key)
            .arg(now_ms)
            .arg(window_ms)
            .arg(member)
            .invoke_async(&mut connection)
            .await
            .map_err(|err| FileGuardError::RateLimit(format!("Redis script failed: {err}")))?;

        debug!(key, count, oldest_ms, "Rate limit window sampled");
        Ok(WindowSample { count, oldest_ms })
    }
}
