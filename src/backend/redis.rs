//! Redis backend for distributed rate limiting.
//!
//! Compare-and-swap is implemented with a Lua script so the check and the
//! write happen as one atomic Redis command, without a `WATCH`/`MULTI`
//! round trip.

use std::time::Duration;

use deadpool_redis::redis::{cmd, AsyncCommands, Script};
use deadpool_redis::{Config, Connection, Pool, Runtime};

use crate::error::{BackendError, Result};

use super::Backend;

/// Redis backend configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g. `redis://localhost:6379`).
    pub url: String,
    /// Connection pool size.
    pub pool_size: usize,
    /// Key prefix applied to every fingerprint.
    pub key_prefix: String,
    /// Timeout for acquiring a pooled connection.
    pub connection_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            key_prefix: "rl:".to_string(),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Create a new Redis configuration pointed at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the pool size.
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Set the connection acquisition timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

// KEYS[1]: fully-prefixed key
// ARGV[1]: "1" if a prior value was expected, "0" if absence was expected
// ARGV[2]: expected value (ignored when ARGV[1] == "0")
// ARGV[3]: new value
// ARGV[4]: ttl in milliseconds
const CAS_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '1' then
    if current == false or current ~= ARGV[2] then
        return 0
    end
else
    if current ~= false then
        return 0
    end
end
redis.call('SET', KEYS[1], ARGV[3], 'PX', ARGV[4])
return 1
"#;

/// Redis backend backed by a pooled connection.
pub struct RedisBackend {
    pool: Pool,
    key_prefix: String,
    cas_script: Script,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl RedisBackend {
    /// Connect and verify reachability with a `PING`.
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        let mut conn = pool
            .get()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;
        let _: () = cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            key_prefix: config.key_prefix,
            cas_script: Script::new(CAS_SCRIPT),
        })
    }

    /// Connect using defaults other than the URL.
    pub async fn from_url(url: impl Into<String>) -> Result<Self> {
        Self::new(RedisConfig::new(url)).await
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn get_conn(&self) -> Result<Connection> {
        self.pool
            .get()
            .await
            .map_err(|_| BackendError::PoolExhausted.into())
    }
}

impl Backend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn
            .get(self.full_key(key))
            .await
            .map_err(|e| BackendError::operation_failed(e.to_string(), true))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(self.full_key(key), value, ttl_secs)
            .await
            .map_err(|e| BackendError::operation_failed(e.to_string(), true))?;
        Ok(())
    }

    async fn check_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: String,
        ttl: Duration,
    ) -> Result<bool> {
        let mut conn = self.get_conn().await?;
        let ttl_ms = ttl.as_millis().max(1) as u64;

        let applied: i64 = self
            .cas_script
            .key(self.full_key(key))
            .arg(if expected.is_some() { "1" } else { "0" })
            .arg(expected.unwrap_or(""))
            .arg(value)
            .arg(ttl_ms)
            .invoke_async(&mut *conn)
            .await
            .map_err(|e| BackendError::operation_failed(e.to_string(), true))?;

        Ok(applied == 1)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_conn().await?;
        conn.del::<_, ()>(self.full_key(key))
            .await
            .map_err(|e| BackendError::operation_failed(e.to_string(), true))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // deadpool releases connections back to the OS when the pool is
        // dropped; there is no explicit shutdown handshake to perform here.
        Ok(())
    }
}
