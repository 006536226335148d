//! Cooperative cancellation handle for the CAS retry loop's backoff sleep.
//!
//! Mirrors the `Notify`-based shutdown idiom the memory backend's GC task
//! uses, rather than pulling in an external cancellation-token crate: a
//! shared flag plus a `Notify` to wake a sleeping waiter immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

/// Below this delay, the retry loop skips the cancellation race entirely —
/// the `tokio::select!` overhead is not worth it for sub-millisecond sleeps.
pub const CANCEL_CHECK_THRESHOLD: Duration = Duration::from_millis(1);

#[derive(Debug)]
struct Inner {
    fired: AtomicBool,
    notify: Notify,
}

/// A cheaply cloneable cancellation signal. `cancel()` may be called from any
/// thread; any number of concurrent `wait_for` callers observe it.
#[derive(Debug, Clone)]
pub struct Cancellation {
    inner: Arc<Inner>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    /// Create a fresh, not-yet-cancelled handle.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                fired: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Signal cancellation, waking any waiters.
    pub fn cancel(&self) {
        self.inner.fired.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether cancellation has already been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// Sleep for `delay`, returning early with `true` if cancellation fires
    /// first. Sleeps shorter than [`CANCEL_CHECK_THRESHOLD`] ignore
    /// cancellation and always run to completion.
    pub async fn sleep_cancellable(&self, delay: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        if delay < CANCEL_CHECK_THRESHOLD {
            tokio::time::sleep(delay).await;
            return false;
        }

        let notified = self.inner.notify.notified();
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = notified => true,
        }
    }
}
