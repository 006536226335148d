//! PostgreSQL backend for distributed rate limiting.
//!
//! State lives in one table, keyed by fingerprint:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS rate_limit_state (
//!     key         TEXT PRIMARY KEY,
//!     value       TEXT NOT NULL,
//!     expires_at  TIMESTAMPTZ NOT NULL
//! );
//! ```
//!
//! Compare-and-swap is a single statement: `INSERT ... ON CONFLICT` for the
//! "expected absent" case, and `UPDATE ... WHERE value = $expected` for the
//! "expected present" case, both reporting success via the affected row
//! count.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::{BackendError, Result};

use super::Backend;

/// PostgreSQL backend configuration.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Postgres connection URL.
    pub url: String,
    /// Maximum number of pooled connections.
    pub max_connections: u32,
    /// Timeout for acquiring a pooled connection.
    pub connection_timeout: Duration,
}

impl PostgresConfig {
    /// Create a new configuration pointed at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            connection_timeout: Duration::from_secs(5),
        }
    }

    /// Set the maximum pool size.
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection acquisition timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// PostgreSQL backend backed by a `sqlx` connection pool.
#[derive(Debug)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Connect, create the backing table if absent, and return a ready
    /// backend.
    pub async fn new(config: PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rate_limit_state (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| BackendError::operation_failed(e.to_string(), false))?;

        Ok(Self { pool })
    }

    /// Wrap an already-connected pool (e.g. shared with the rest of an
    /// application).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn expires_at(ttl: Duration) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero())
    }
}

impl Backend for PostgresBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM rate_limit_state WHERE key = $1 AND expires_at > now()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BackendError::operation_failed(e.to_string(), true))?;

        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rate_limit_state (key, value, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Self::expires_at(ttl))
        .execute(&self.pool)
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
        let expires_at = Self::expires_at(ttl);

        let applied = match expected {
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO rate_limit_state (key, value, expires_at)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at
                    WHERE rate_limit_state.expires_at <= now()
                    "#,
                )
                .bind(key)
                .bind(value)
                .bind(expires_at)
                .execute(&self.pool)
                .await
                .map_err(|e| BackendError::operation_failed(e.to_string(), true))?;
                result.rows_affected() == 1
            }
            Some(expected_value) => {
                let result = sqlx::query(
                    r#"
                    UPDATE rate_limit_state
                    SET value = $2, expires_at = $3
                    WHERE key = $1 AND value = $4 AND expires_at > now()
                    "#,
                )
                .bind(key)
                .bind(&value)
                .bind(expires_at)
                .bind(expected_value)
                .execute(&self.pool)
                .await
                .map_err(|e| BackendError::operation_failed(e.to_string(), true))?;
                result.rows_affected() == 1
            }
        };

        Ok(applied)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM rate_limit_state WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| BackendError::operation_failed(e.to_string(), true))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_config_builder() {
        let config = PostgresConfig::new("postgres://localhost/ratelimit")
            .with_max_connections(20)
            .with_connection_timeout(Duration::from_secs(3));

        assert_eq!(config.url, "postgres://localhost/ratelimit");
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.connection_timeout, Duration::from_secs(3));
    }
}
