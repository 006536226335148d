//! Leaky Bucket engine: continuous drain down to zero, one request queued
//! per allowed call.

use std::time::{Duration, SystemTime};

use crate::codec::leaky_bucket::LeakyBucketState;
use crate::decision::{QuotaResult, ResultSink, DEFAULT_QUOTA_NAME};
use crate::error::BackendError;
use crate::quota::BucketParams;

use super::{capped_retries, ns_since_epoch, Algorithm};

/// Leaky Bucket engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeakyBucketAlgorithm;

impl Algorithm for LeakyBucketAlgorithm {
    type Config = BucketParams;
    type State = LeakyBucketState;

    const NAME: &'static str = "leaky_bucket";

    fn decode(raw: &str) -> Result<Self::State, BackendError> {
        LeakyBucketState::decode(raw)
    }

    fn encode(state: &Self::State) -> String {
        state.encode()
    }

    fn ttl(config: &Self::Config) -> Duration {
        Duration::from_secs_f64(5.0 * config.burst() as f64 / config.rate()).max(Duration::from_secs(1))
    }

    fn max_retries(config: &Self::Config) -> u32 {
        capped_retries(config.burst() + 1)
    }

    fn step(
        config: &Self::Config,
        state: Option<Self::State>,
        now: SystemTime,
        consume: bool,
    ) -> (ResultSink, Self::State) {
        let now_ns = ns_since_epoch(now);
        let burst = config.burst() as f64;
        let rate = config.rate();

        let (requests, last_leak_ns) = match state {
            Some(s) => (s.requests, s.last_leak_ns),
            None => (0.0, now_ns),
        };

        let elapsed_secs = ((now_ns - last_leak_ns).max(0) as f64) / 1e9;
        let drained = (requests - elapsed_secs * rate).max(0.0);

        let allow = drained + 1.0 <= burst;
        let after = if allow && consume { drained + 1.0 } else { drained };

        let remaining = (burst - after.ceil()).max(0.0) as u64;
        let reset = if allow {
            now
        } else {
            now + Duration::from_secs_f64((after / rate).max(0.0))
        };

        let mut results = ResultSink::new();
        results.insert(DEFAULT_QUOTA_NAME, QuotaResult::new(allow, remaining, reset));

        (
            results,
            LeakyBucketState {
                requests: after,
                last_leak_ns: now_ns,
            },
        )
    }
}
