//! Rate limiting algorithm engines.
//!
//! Each engine is a pure function from `(config, current state, now)` to
//! `(results, new state)` — no backend access, no retry logic. The retry
//! driver (`crate::retry`) owns the CAS loop and calls into these; the
//! dual-strategy orchestrator (`crate::dual`) calls two of them side by
//! side over one composite state.
//!
//! # Available engines
//!
//! - [`FixedWindowAlgorithm`]: multi-quota fixed window counters.
//! - [`TokenBucketAlgorithm`]: continuous-refill token accounting.
//! - [`LeakyBucketAlgorithm`]: continuous-drain queue accounting.
//! - [`GcraAlgorithm`]: single-timestamp spaced-rate accounting.

pub mod fixed_window;
pub mod gcra;
pub mod leaky_bucket;
pub mod token_bucket;

pub use fixed_window::FixedWindowAlgorithm;
pub use gcra::GcraAlgorithm;
pub use leaky_bucket::LeakyBucketAlgorithm;
pub use token_bucket::TokenBucketAlgorithm;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::decision::ResultSink;
use crate::error::BackendError;

/// Hard cap on auto-derived `max_retries`, shared by every engine.
pub const MAX_RETRIES_CAP: u32 = 9390;

/// A rate limiting engine: pure state-machine logic, no I/O.
///
/// Implementors are zero-sized marker types; all state lives in `Config`
/// (caller-supplied, unchanging) and `State` (persisted, evolved by
/// `step`).
pub trait Algorithm: Send + Sync + 'static {
    /// Per-fingerprint configuration (quotas, burst/rate, ...).
    type Config: Send + Sync + Clone;
    /// Persisted state, round-tripped through a codec.
    type State: Send + Sync + Clone + Default;

    /// Name used in logs and in the default result-sink key.
    const NAME: &'static str;

    /// Decode a backend value into this engine's state.
    fn decode(raw: &str) -> Result<Self::State, BackendError>;

    /// Encode this engine's state for storage.
    fn encode(state: &Self::State) -> String;

    /// TTL to apply when writing state back.
    fn ttl(config: &Self::Config) -> Duration;

    /// Auto-derived retry budget for this config, capped at
    /// [`MAX_RETRIES_CAP`].
    fn max_retries(config: &Self::Config) -> u32;

    /// Evaluate one step at `now`. `state` is `None` on first observation
    /// of a fingerprint. When `consume` is `false` this is a peek: the
    /// returned state reflects what *would* happen, but the caller must
    /// not persist it.
    fn step(
        config: &Self::Config,
        state: Option<Self::State>,
        now: SystemTime,
        consume: bool,
    ) -> (ResultSink, Self::State);
}

pub(crate) fn ns_since_epoch(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_nanos() as i64,
        Err(e) => -(e.duration().as_nanos() as i64),
    }
}

pub(crate) fn system_time_from_ns(ns: i64) -> SystemTime {
    if ns >= 0 {
        UNIX_EPOCH + Duration::from_nanos(ns as u64)
    } else {
        UNIX_EPOCH - Duration::from_nanos((-ns) as u64)
    }
}

pub(crate) fn capped_retries(value: u64) -> u32 {
    value.min(MAX_RETRIES_CAP as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ns_round_trip() {
        let t = UNIX_EPOCH + Duration::from_secs(12345);
        assert_eq!(system_time_from_ns(ns_since_epoch(t)), t);
    }

    #[test]
    fn test_capped_retries() {
        assert_eq!(capped_retries(10), 10);
        assert_eq!(capped_retries(1_000_000), MAX_RETRIES_CAP);
    }
}
