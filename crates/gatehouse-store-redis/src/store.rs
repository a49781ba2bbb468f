//! Redis-backed ephemeral store.
//!
//! Every operation is a network round-trip against a TTL-native
//! key/value service, issued through a `deadpool_redis` connection pool.
//! Expiry is delegated to Redis entirely; there is no sweeper on this
//! side.
//!
//! Callers must treat every call as fallible: a Redis outage degrades
//! the security checks built on top of this store, it must never take
//! the authentication path down with it.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::{AsyncCommands, Script};

use gatehouse_store::{EphemeralStore, StoreError, StoreResult};

/// INCR and EXPIRE must be one atomic step on first creation, otherwise
/// a counter created between the two commands can live without an
/// expiry and accumulate forever.
const INCREMENT_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
  redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
";

/// Ephemeral store backed by a Redis connection pool.
pub struct RedisStore {
    pool: Pool,
    increment: Script,
}

impl RedisStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            increment: Script::new(INCREMENT_SCRIPT),
        }
    }

    /// Builds a connection pool for `url` and wraps it in a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created from the URL.
    /// Connectivity itself is only exercised on first use.
    pub fn connect(url: &str) -> StoreResult<Self> {
        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::connection(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Checks whether the backend currently answers a PING.
    pub async fn is_available(&self) -> bool {
        match self.pool.get().await {
            Ok(mut conn) => {
                let reply: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
                reply.is_ok()
            }
            Err(_) => false,
        }
    }

    async fn conn(&self) -> StoreResult<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::connection(e.to_string()))
    }
}

#[async_trait]
impl EphemeralStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        // SET .. EX rejects 0; clamp to the shortest expiry Redis accepts.
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(|e| StoreError::backend(e.to_string()))
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn().await?;
        conn.get(key)
            .await
            .map_err(|e| StoreError::backend(e.to_string()))
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        conn.exists(key)
            .await
            .map_err(|e| StoreError::backend(e.to_string()))
    }

    async fn increment(&self, key: &str, ttl: Duration) -> StoreResult<i64> {
        let mut conn = self.conn().await?;
        let ttl_secs = ttl.as_secs().max(1);
        let count: i64 = self
            .increment
            .key(key)
            .arg(ttl_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::backend(e.to_string()))?;
        Ok(count)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| StoreError::backend(e.to_string()))
    }

    async fn ttl_remaining(&self, key: &str) -> StoreResult<Option<Duration>> {
        let mut conn = self.conn().await?;
        let ttl: i64 = conn
            .ttl(key)
            .await
            .map_err(|e| StoreError::backend(e.to_string()))?;
        // -2: no such key, -1: key without expiry.
        if ttl < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_secs(ttl.unsigned_abs())))
        }
    }

    async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<(String, String)>> {
        let mut conn = self.conn().await?;
        let pattern = format!("{prefix}*");

        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| StoreError::backend(e.to_string()))?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        let mut pairs = Vec::with_capacity(keys.len());
        for key in keys {
            let value: Option<String> = conn
                .get(&key)
                .await
                .map_err(|e| StoreError::backend(e.to_string()))?;
            // Keys can expire between SCAN and GET; skip them.
            if let Some(value) = value {
                pairs.push((key, value));
            }
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_store_creation() {
        // Compile-time check that the store builds from a URL; behavior
        // tests require a live Redis instance.
        assert!(super::RedisStore::connect("redis://127.0.0.1:6379").is_ok());
    }
}
