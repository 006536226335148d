//! Lock-free circuit breaker guarding the failover backend's primary.
//!
//! Three states, no async locking on the hot path: [`BreakerState::Closed`]
//! (primary serving normally), [`BreakerState::Open`] (primary skipped,
//! every call goes straight to the secondary), [`BreakerState::HalfOpen`]
//! (one probe window, used to decide whether to close again).

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Closed,
            1 => Self::Open,
            _ => Self::HalfOpen,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitConfig {
    /// Consecutive failures while closed before tripping open.
    pub failure_threshold: u64,
    /// Consecutive successes while half-open before closing again.
    pub success_threshold: u64,
    /// How long to stay open before allowing a half-open probe.
    pub recovery_timeout: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 1,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

/// A lock-free circuit breaker over atomics, with a small mutex guarding
/// only the last-transition timestamp.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: AtomicU8,
    failure_count: AtomicU64,
    success_count: AtomicU64,
    config: CircuitConfig,
    last_transition_at: Mutex<Instant>,
}

impl CircuitBreaker {
    /// Create a new breaker, starting closed.
    pub fn new(config: CircuitConfig) -> Self {
        Self {
            state: AtomicU8::new(BreakerState::Closed.as_u8()),
            failure_count: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            config,
            last_transition_at: Mutex::new(Instant::now()),
        }
    }

    /// Current state, reflecting a pending Open -> HalfOpen transition if
    /// the recovery timeout has elapsed.
    pub fn state(&self) -> BreakerState {
        self.maybe_recover();
        BreakerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether a call should be routed to the primary right now.
    pub fn allow_primary(&self) -> bool {
        !matches!(self.state(), BreakerState::Open)
    }

    /// Record a successful primary call.
    pub fn record_success(&self) {
        match self.state() {
            BreakerState::HalfOpen => {
                let count = self.success_count.fetch_add(1, Ordering::AcqRel) + 1;
                if count >= self.config.success_threshold {
                    self.transition(BreakerState::Closed);
                }
            }
            BreakerState::Closed => {
                self.failure_count.store(0, Ordering::Release);
            }
            BreakerState::Open => {}
        }
    }

    /// Record a failed primary call.
    pub fn record_failure(&self) {
        match self.state() {
            BreakerState::HalfOpen => self.transition(BreakerState::Open),
            BreakerState::Closed => {
                let count = self.failure_count.fetch_add(1, Ordering::AcqRel) + 1;
                if count >= self.config.failure_threshold {
                    self.transition(BreakerState::Open);
                }
            }
            BreakerState::Open => {}
        }
    }

    fn maybe_recover(&self) {
        if BreakerState::from_u8(self.state.load(Ordering::Acquire)) != BreakerState::Open {
            return;
        }
        let elapsed = self.last_transition_at.lock().elapsed();
        if elapsed >= self.config.recovery_timeout {
            self.transition(BreakerState::HalfOpen);
        }
    }

    fn transition(&self, to: BreakerState) {
        self.state.store(to.as_u8(), Ordering::Release);
        self.failure_count.store(0, Ordering::Release);
        self.success_count.store(0, Ordering::Release);
        *self.last_transition_at.lock() = Instant::now();
    }
}
