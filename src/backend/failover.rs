//! Failover backend: a circuit breaker and health checker wrapped around a
//! primary, silently redirecting to an in-memory secondary when the
//! primary is unhealthy.
//!
//! The secondary is always in-memory and owned by the failover backend
//! itself — this isn't a generic two-backend union, it's specifically the
//! "remote primary, local emergency backup" shape the breaker and health
//! checker are built for. Clients observe a full or partial quota reset
//! when traffic flips between primary and secondary, since the two keep
//! independent state; strong cross-backend consistency is explicitly not a
//! goal here.

use std::sync::Arc;
use std::time::Duration;

use crate::circuit::{CircuitBreaker, CircuitConfig};
use crate::error::Result;
use crate::health::{HealthChecker, HealthConfig};

use super::memory::MemoryBackend;
use super::Backend;

const HEALTH_PROBE_KEY: &str = "__ocra_failover_health_probe__";

/// Marker for backends eligible to sit behind a [`FailoverBackend`].
///
/// Deliberately not implemented by [`MemoryBackend`] (an in-memory primary
/// gains nothing from failing over to another in-memory backend) or by
/// [`FailoverBackend`] itself (failover backends must not nest). Both
/// restrictions are enforced at compile time via this trait bound rather
/// than at construction.
pub trait FailoverEligible: Backend {}

#[cfg(feature = "redis")]
impl FailoverEligible for super::redis::RedisBackend {}

#[cfg(feature = "postgres")]
impl FailoverEligible for super::postgres::PostgresBackend {}

/// Failover backend configuration.
#[derive(Debug, Clone, Default)]
pub struct FailoverConfig {
    pub circuit: CircuitConfig,
    pub health: HealthConfig,
}

/// Routes every operation to `primary` while the breaker is closed or
/// half-open, and to an owned in-memory secondary while it's open.
pub struct FailoverBackend<P: FailoverEligible> {
    primary: Arc<P>,
    secondary: Arc<MemoryBackend>,
    breaker: Arc<CircuitBreaker>,
    health: HealthChecker,
}

impl<P: FailoverEligible> std::fmt::Debug for FailoverBackend<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverBackend")
            .field("breaker_state", &self.breaker.state())
            .finish()
    }
}

impl<P: FailoverEligible> FailoverBackend<P> {
    /// Wrap `primary` with a breaker and background health checker.
    pub fn new(primary: P, config: FailoverConfig) -> Self {
        let primary = Arc::new(primary);
        let secondary = Arc::new(MemoryBackend::new());
        let breaker = Arc::new(CircuitBreaker::new(config.circuit));

        let probe_primary = primary.clone();
        let probe_breaker = breaker.clone();
        let health = HealthChecker::spawn(config.health, move || {
            let primary = probe_primary.clone();
            let breaker = probe_breaker.clone();
            async move {
                let ok = primary.get(HEALTH_PROBE_KEY).await.is_ok();
                if ok {
                    breaker.record_success();
                } else {
                    breaker.record_failure();
                }
                ok
            }
        });

        Self {
            primary,
            secondary,
            breaker,
            health,
        }
    }

    /// The current breaker state, for observability.
    pub fn breaker_state(&self) -> crate::circuit::BreakerState {
        self.breaker.state()
    }
}

impl<P: FailoverEligible> Backend for FailoverBackend<P> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        use crate::circuit::BreakerState::*;
        match self.breaker.state() {
            Open => self.secondary.get(key).await,
            Closed | HalfOpen => match self.primary.get(key).await {
                Ok(value) => {
                    self.breaker.record_success();
                    Ok(value)
                }
                Err(err) => {
                    self.breaker.record_failure();
                    Err(err)
                }
            },
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        use crate::circuit::BreakerState::*;
        match self.breaker.state() {
            Open => self.secondary.set(key, value, ttl).await,
            Closed | HalfOpen => match self.primary.set(key, value, ttl).await {
                Ok(()) => {
                    self.breaker.record_success();
                    Ok(())
                }
                Err(err) => {
                    self.breaker.record_failure();
                    Err(err)
                }
            },
        }
    }

    async fn check_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: String,
        ttl: Duration,
    ) -> Result<bool> {
        use crate::circuit::BreakerState::*;
        match self.breaker.state() {
            Open => self.secondary.check_and_set(key, expected, value, ttl).await,
            Closed | HalfOpen => {
                match self.primary.check_and_set(key, expected, value, ttl).await {
                    Ok(applied) => {
                        self.breaker.record_success();
                        Ok(applied)
                    }
                    Err(err) => {
                        self.breaker.record_failure();
                        Err(err)
                    }
                }
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        use crate::circuit::BreakerState::*;
        match self.breaker.state() {
            Open => self.secondary.delete(key).await,
            Closed | HalfOpen => match self.primary.delete(key).await {
                Ok(()) => {
                    self.breaker.record_success();
                    Ok(())
                }
                Err(err) => {
                    self.breaker.record_failure();
                    Err(err)
                }
            },
        }
    }

    async fn close(&self) -> Result<()> {
        self.health.shutdown();
        self.primary.close().await?;
        self.secondary.close().await?;
        Ok(())
    }
}
