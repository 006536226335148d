//! In-memory backend with automatic garbage collection.
//!
//! Uses `DashMap` for thread-safe concurrent access and includes
//! configurable garbage collection to prevent unbounded memory growth.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::Result;

use super::current_timestamp_ms;
use super::Backend;

/// Garbage collection interval configuration.
#[derive(Debug, Clone)]
pub enum GcInterval {
    /// Run GC every N requests.
    Requests(u64),
    /// Run GC at fixed time intervals, in a background task.
    Duration(Duration),
    /// Only run GC when `MemoryBackend::run_gc` is called explicitly.
    Manual,
}

impl Default for GcInterval {
    fn default() -> Self {
        Self::Requests(10_000)
    }
}

/// Garbage collection configuration.
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// When to trigger GC.
    pub interval: GcInterval,
    /// Entries untouched for longer than this are swept even if their TTL
    /// hasn't technically elapsed yet (default: 1 hour).
    pub max_age: Duration,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            interval: GcInterval::default(),
            max_age: Duration::from_secs(3600),
        }
    }
}

impl GcConfig {
    /// Create config with request-based GC.
    pub fn on_requests(count: u64) -> Self {
        Self {
            interval: GcInterval::Requests(count),
            ..Default::default()
        }
    }

    /// Create config with time-based GC.
    pub fn on_duration(interval: Duration) -> Self {
        Self {
            interval: GcInterval::Duration(interval),
            ..Default::default()
        }
    }

    /// Create config with manual GC only.
    pub fn manual() -> Self {
        Self {
            interval: GcInterval::Manual,
            ..Default::default()
        }
    }

    /// Set the maximum age for entries.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: u64,
    last_touched: u64,
}

/// In-memory backend with garbage collection.
///
/// # Example
///
/// ```ignore
/// use ocra_ratelimit::backend::{MemoryBackend, GcConfig};
/// use std::time::Duration;
///
/// let backend = MemoryBackend::new();
/// let backend = MemoryBackend::with_gc(GcConfig::on_duration(Duration::from_secs(60)));
/// ```
pub struct MemoryBackend {
    data: DashMap<String, Entry>,
    gc_config: GcConfig,
    request_count: AtomicU64,
    gc_lock: Mutex<()>,
    shutdown: Arc<Notify>,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("entries", &self.data.len())
            .field("gc_config", &self.gc_config)
            .finish()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create a new in-memory backend with default GC configuration.
    pub fn new() -> Self {
        Self::with_gc(GcConfig::default())
    }

    /// Create a new in-memory backend with a custom GC configuration.
    pub fn with_gc(gc_config: GcConfig) -> Self {
        let backend = Self {
            data: DashMap::new(),
            gc_config: gc_config.clone(),
            request_count: AtomicU64::new(0),
            gc_lock: Mutex::new(()),
            shutdown: Arc::new(Notify::new()),
        };

        if let GcInterval::Duration(interval) = gc_config.interval {
            backend.start_gc_task(interval);
        }

        backend
    }

    fn start_gc_task(&self, interval: Duration) {
        let data = self.data.clone();
        let max_age = self.gc_config.max_age;
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        sweep(&data, max_age);
                    }
                    _ = shutdown.notified() => break,
                }
            }
        });
    }

    /// Manually trigger garbage collection.
    pub fn run_gc(&self) {
        sweep(&self.data, self.gc_config.max_age);
    }

    /// Number of entries currently stored (including not-yet-swept expired
    /// ones).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the backend currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn maybe_run_gc(&self) {
        if let GcInterval::Requests(threshold) = self.gc_config.interval {
            let count = self.request_count.fetch_add(1, Ordering::Relaxed) + 1;
            if threshold > 0 && count % threshold == 0 {
                if let Some(_guard) = self.gc_lock.try_lock() {
                    sweep(&self.data, self.gc_config.max_age);
                }
            }
        }
    }
}

impl Drop for MemoryBackend {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}

fn sweep(data: &DashMap<String, Entry>, max_age: Duration) {
    let now = current_timestamp_ms();
    let cutoff = now.saturating_sub(max_age.as_millis() as u64);
    data.retain(|_, entry| entry.expires_at > now && entry.last_touched > cutoff);
}

impl Backend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.maybe_run_gc();

        let now = current_timestamp_ms();
        if let Some(entry) = self.data.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
            drop(entry);
            self.data.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.maybe_run_gc();

        let now = current_timestamp_ms();
        self.data.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl.as_millis() as u64,
                last_touched: now,
            },
        );
        Ok(())
    }

    async fn check_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: String,
        ttl: Duration,
    ) -> Result<bool> {
        self.maybe_run_gc();

        let now = current_timestamp_ms();
        let expires_at = now + ttl.as_millis() as u64;

        // Holding the shard's entry for the whole match makes the
        // compare-and-replace atomic with respect to other callers racing
        // on the same key.
        use dashmap::mapref::entry::Entry as MapEntry;
        let applied = match self.data.entry(key.to_string()) {
            MapEntry::Occupied(mut occ) => {
                let current = (occ.get().expires_at > now).then(|| occ.get().value.as_str());
                if current == expected {
                    occ.insert(Entry {
                        value,
                        expires_at,
                        last_touched: now,
                    });
                    true
                } else {
                    false
                }
            }
            MapEntry::Vacant(vac) => {
                if expected.is_none() {
                    vac.insert(Entry {
                        value,
                        expires_at,
                        last_touched: now,
                    });
                    true
                } else {
                    false
                }
            }
        };
        Ok(applied)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.shutdown.notify_waiters();
        Ok(())
    }
}
