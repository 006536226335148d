//! Background health probing for the failover backend's primary.
//!
//! Runs a user-supplied probe on a fixed interval in its own task, tracks
//! the latest result in an atomic flag, and shuts down cleanly via the
//! same `Notify`-based handshake the in-memory backend uses for its GC
//! task.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::warn;

/// Health checker configuration.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// How often to probe.
    pub interval: Duration,
    /// How long a single probe may take before counting as a failure.
    pub probe_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

/// Runs a probe on a background task and exposes its latest result.
pub struct HealthChecker {
    healthy: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

impl HealthChecker {
    /// Spawn a health checker that considers the backend healthy until the
    /// first probe completes.
    pub fn spawn<F, Fut>(config: HealthConfig, probe: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let healthy = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(Notify::new());

        let task_healthy = healthy.clone();
        let task_shutdown = shutdown.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval);
            // The first tick fires immediately; skip it so the first probe
            // happens one interval in, matching "probe every N seconds".
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let ok = match timeout(config.probe_timeout, probe()).await {
                            Ok(result) => result,
                            Err(_) => {
                                warn!("health probe timed out after {:?}", config.probe_timeout);
                                false
                            }
                        };
                        task_healthy.store(ok, Ordering::Release);
                    }
                    _ = task_shutdown.notified() => break,
                }
            }
        });

        Self { healthy, shutdown }
    }

    /// Latest probe result.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Stop the background probe task. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for HealthChecker {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}
