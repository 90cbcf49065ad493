use super::RateLimitStore;
use crate::config::{millis, RateLimitConfig};
use crate::error::StoreError;
use crate::result::{RateLimitInfo, RateLimitResult};
use futures::future::BoxFuture;
use rand::Rng;
use redis::aio::ConnectionManager;
use redis::Script;
use std::time::Duration;

/// Longest window or block passed to Redis; Lua numbers stay exact below 2^53.
const MAX_TTL_MS: u64 = 1 << 52;

// KEYS[1] = window log (sorted set scored by timestamp), KEYS[2] = block flag
// ARGV = now, window, limit, block, member
// Returns {allowed, remaining, reset_at, retry_after}
const CHECK_SCRIPT: &str = r#"
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
local block = tonumber(ARGV[4])

local blocked_until = tonumber(redis.call('GET', KEYS[2]) or '0')
if blocked_until > now then
  return {0, 0, blocked_until, blocked_until - now}
end

redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', now - window)
local count = redis.call('ZCARD', KEYS[1])

if count >= limit then
  if block > 0 then
    redis.call('SET', KEYS[2], now + block, 'PX', block)
    return {0, 0, now + block, block}
  end
  local reset_at = now + window
  local oldest = redis.call('ZRANGE', KEYS[1], 0, 0, 'WITHSCORES')
  if oldest[2] then
    reset_at = tonumber(oldest[2]) + window
  end
  return {0, 0, reset_at, reset_at - now}
end

redis.call('ZADD', KEYS[1], now, ARGV[5])
redis.call('PEXPIRE', KEYS[1], window)
local oldest = redis.call('ZRANGE', KEYS[1], 0, 0, 'WITHSCORES')
return {1, limit - count - 1, tonumber(oldest[2]) + window, 0}
"#;

/// Store backed by Redis sorted sets.
///
/// Each check runs as one Lua script, so instances in different processes
/// sharing a Redis server see a single consistent window per key. Logs expire
/// after one window of inactivity and block flags when the block ends.
///
/// Both keys of an identifier share a hash tag, so the script also runs on
/// Redis Cluster.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    script: Script,
}

impl RedisStore {
    /// Connects to `url` (for example `redis://127.0.0.1/`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self::new(connection))
    }

    /// Uses an existing connection manager.
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            script: Script::new(CHECK_SCRIPT),
        }
    }

    fn log_key(key: &str) -> String {
        format!("{{{key}}}")
    }

    fn block_key(key: &str) -> String {
        format!("{{{key}}}:block")
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RateLimitStore for RedisStore {
    fn check<'a>(
        &'a self,
        key: &'a str,
        config: &'a RateLimitConfig,
        now: u64,
    ) -> BoxFuture<'a, Result<RateLimitResult, StoreError>> {
        Box::pin(async move {
            let member = format!("{now}-{}", rand::rng().random_range(0..u32::MAX));
            let mut conn = self.connection.clone();

            let reply: Vec<i64> = self
                .script
                .key(Self::log_key(key))
                .key(Self::block_key(key))
                .arg(now)
                .arg(config.window_millis().min(MAX_TTL_MS))
                .arg(config.limit)
                .arg(config.block_millis().min(MAX_TTL_MS))
                .arg(member)
                .invoke_async(&mut conn)
                .await?;

            let [allowed, remaining, reset_at, retry_after] = reply[..] else {
                return Err(StoreError::InvalidReply(format!("{reply:?}")));
            };

            Ok(RateLimitResult {
                allowed: allowed == 1,
                limit: config.limit,
                remaining: remaining.max(0) as u32,
                reset_at: reset_at.max(0) as u64,
                retry_after: (allowed != 1)
                    .then(|| Duration::from_millis(retry_after.max(0) as u64)),
            })
        })
    }

    fn reset<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut conn = self.connection.clone();
            let _: () = redis::cmd("DEL")
                .arg(Self::log_key(key))
                .arg(Self::block_key(key))
                .query_async(&mut conn)
                .await?;
            Ok(())
        })
    }

    fn block<'a>(
        &'a self,
        key: &'a str,
        until: u64,
        now: u64,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut conn = self.connection.clone();
            let ttl = until.saturating_sub(now).clamp(1, MAX_TTL_MS);
            let _: () = redis::cmd("SET")
                .arg(Self::block_key(key))
                .arg(now + ttl)
                .arg("PX")
                .arg(ttl)
                .query_async(&mut conn)
                .await?;
            Ok(())
        })
    }

    fn unblock<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut conn = self.connection.clone();
            let _: () = redis::cmd("DEL")
                .arg(Self::block_key(key))
                .query_async(&mut conn)
                .await?;
            Ok(())
        })
    }

    fn info<'a>(
        &'a self,
        key: &'a str,
        window: Duration,
        now: u64,
    ) -> BoxFuture<'a, Result<RateLimitInfo, StoreError>> {
        Box::pin(async move {
            let mut conn = self.connection.clone();
            let cutoff = now.saturating_sub(millis(window));

            let (count, blocked_until): (u32, Option<u64>) = redis::pipe()
                .cmd("ZCOUNT")
                .arg(Self::log_key(key))
                .arg(format!("({cutoff}"))
                .arg("+inf")
                .cmd("GET")
                .arg(Self::block_key(key))
                .query_async(&mut conn)
                .await?;

            let blocked_until = blocked_until.filter(|&until| until > now);
            Ok(RateLimitInfo {
                count,
                blocked: blocked_until.is_some(),
                blocked_until,
            })
        })
    }
}
