//! Backend trait and implementations.
//!
//! This module defines the `Backend` trait that all storage backends must
//! implement, along with built-in implementations for in-memory, Redis, and
//! PostgreSQL storage, plus a failover wrapper that composes two of them.
//!
//! Unlike a typed key-value store, a `Backend` only ever sees opaque,
//! already-encoded strings — the algorithm and codec layers own all
//! structure. This keeps the trait stable across every algorithm this crate
//! adds in the future.

#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "memory")]
mod failover;

#[cfg(feature = "memory")]
pub use memory::{GcConfig, GcInterval, MemoryBackend};

#[cfg(feature = "redis")]
pub use self::redis::{RedisBackend, RedisConfig};

#[cfg(feature = "postgres")]
pub use postgres::{PostgresBackend, PostgresConfig};

#[cfg(feature = "memory")]
pub use failover::{FailoverBackend, FailoverConfig, FailoverEligible};

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Backend contract for rate limiting state.
///
/// All operations are async to support both local and distributed backends.
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Required operations
///
/// - `get`: Retrieve a fingerprint's encoded state.
/// - `set`: Unconditionally overwrite a fingerprint's state with a TTL.
/// - `check_and_set`: Compare-and-swap, the backbone of the retry driver.
/// - `delete`: Remove a fingerprint.
/// - `close`: Release held resources (connections, background tasks). Must
///   be idempotent.
pub trait Backend: Send + Sync + 'static {
    /// Get the current encoded state for `key`.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Unconditionally set the encoded state for `key`, with a TTL.
    fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Compare-and-swap: replace `key`'s value with `value` only if its
    /// current value equals `expected` (`None` meaning "key absent").
    ///
    /// Returns `true` if the swap applied.
    fn check_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: String,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Delete a key. Succeeds even if the key didn't exist.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Release any resources held by this backend. Idempotent.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}

impl<B: Backend + ?Sized> Backend for std::sync::Arc<B> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        (**self).set(key, value, ttl).await
    }

    async fn check_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: String,
        ttl: Duration,
    ) -> Result<bool> {
        (**self).check_and_set(key, expected, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        (**self).set(key, value, ttl).await
    }

    async fn check_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: String,
        ttl: Duration,
    ) -> Result<bool> {
        (**self).check_and_set(key, expected, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}

/// Current Unix timestamp, in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_millis() as u64
}
