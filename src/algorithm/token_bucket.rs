//! Token Bucket engine: continuous refill up to `burst`, one token
//! consumed per allowed request.

use std::time::{Duration, SystemTime};

use crate::codec::token_bucket::TokenBucketState;
use crate::decision::{QuotaResult, ResultSink, DEFAULT_QUOTA_NAME};
use crate::error::BackendError;
use crate::quota::BucketParams;

use super::{capped_retries, ns_since_epoch, Algorithm};

/// Token Bucket engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenBucketAlgorithm;

impl Algorithm for TokenBucketAlgorithm {
    type Config = BucketParams;
    type State = TokenBucketState;

    const NAME: &'static str = "token_bucket";

    fn decode(raw: &str) -> Result<Self::State, BackendError> {
        TokenBucketState::decode(raw)
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

        let (tokens, last_refill_ns) = match state {
            Some(s) => (s.tokens, s.last_refill_ns),
            None => (burst, now_ns),
        };

        let elapsed_secs = ((now_ns - last_refill_ns).max(0) as f64) / 1e9;
        let refilled = (tokens + elapsed_secs * rate).min(burst);

        let allow = refilled.floor() >= 1.0;
        let after = if allow && consume { refilled - 1.0 } else { refilled };

        let remaining = after.floor().max(0.0) as u64;
        let reset = if allow {
            now
        } else {
            let fractional = after - after.floor();
            now + Duration::from_secs_f64(((1.0 - fractional) / rate).max(0.0))
        };

        let mut results = ResultSink::new();
        results.insert(DEFAULT_QUOTA_NAME, QuotaResult::new(allow, remaining, reset));

        (
            results,
            TokenBucketState {
                tokens: after,
                last_refill_ns: now_ns,
            },
        )
    }
}
