//! GCRA engine: a single theoretical-arrival-time timestamp enforcing
//! evenly spaced requests with bounded burst tolerance.

use std::time::{Duration, SystemTime};

use crate::codec::gcra::GcraState;
use crate::decision::{QuotaResult, ResultSink, DEFAULT_QUOTA_NAME};
use crate::error::BackendError;
use crate::quota::BucketParams;

use super::{capped_retries, ns_since_epoch, system_time_from_ns, Algorithm};

/// GCRA engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct GcraAlgorithm;

impl Algorithm for GcraAlgorithm {
    type Config = BucketParams;
    type State = GcraState;

    const NAME: &'static str = "gcra";

    fn decode(raw: &str) -> Result<Self::State, BackendError> {
        GcraState::decode(raw)
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
        let emission_interval_ns = config.emission_interval().as_nanos() as i64;
        let limit_ns = (config.burst() - 1) as i64 * emission_interval_ns;

        let tat_ns = state.map(|s| s.tat_ns).unwrap_or(now_ns);
        let tat_prime_ns = tat_ns.max(now_ns);
        let allow_at_ns = tat_prime_ns - limit_ns;

        let allow = now_ns >= allow_at_ns;
        let tat_final_ns = if allow && consume {
            tat_prime_ns + emission_interval_ns
        } else {
            tat_prime_ns
        };

        let (remaining, reset_ns) = if allow {
            let remaining = ((limit_ns - (tat_final_ns - now_ns)) / emission_interval_ns).max(0);
            (remaining as u64, tat_final_ns - limit_ns)
        } else {
            (0, allow_at_ns)
        };

        let mut results = ResultSink::new();
        results.insert(
            DEFAULT_QUOTA_NAME,
            QuotaResult::new(allow, remaining, system_time_from_ns(reset_ns)),
        );

        (results, GcraState { tat_ns: tat_final_ns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn test_spacing_then_deny() {
        let config = BucketParams::new(1, 1.0).unwrap(); // one request per second, no burst tolerance
        let now = UNIX_EPOCH + Duration::from_secs(1000);

        let (results, state) = GcraAlgorithm::step(&config, None, now, true);
        assert!(results.default_quota().unwrap().allowed);

        let (results, _) = GcraAlgorithm::step(&config, Some(state), now, true);
        assert!(!results.default_quota().unwrap().allowed);
    }

    #[test]
    fn test_burst_tolerance_allows_consecutive_requests() {
        let config = BucketParams::new(3, 1.0).unwrap();
        let now = UNIX_EPOCH + Duration::from_secs(1000);

        let mut state = None;
        for _ in 0..3 {
            let (results, next) = GcraAlgorithm::step(&config, state, now, true);
            assert!(results.default_quota().unwrap().allowed);
            state = Some(next);
        }

        let (results, _) = GcraAlgorithm::step(&config, state, now, true);
        assert!(!results.default_quota().unwrap().allowed);
    }

    #[test]
    fn test_allows_again_after_emission_interval() {
        let config = BucketParams::new(1, 2.0).unwrap(); // emission interval 500ms
        let now = UNIX_EPOCH + Duration::from_secs(1000);

        let (_, state) = GcraAlgorithm::step(&config, None, now, true);
        let (results, _) = GcraAlgorithm::step(&config, Some(state.clone()), now, true);
        assert!(!results.default_quota().unwrap().allowed);

        let later = now + Duration::from_millis(500);
        let (results, _) = GcraAlgorithm::step(&config, Some(state), later, true);
        assert!(results.default_quota().unwrap().allowed);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let config = BucketParams::new(1, 1.0).unwrap();
        let now = UNIX_EPOCH + Duration::from_secs(1000);

        let (peek_results, peek_state) = GcraAlgorithm::step(&config, None, now, false);
        assert!(peek_results.default_quota().unwrap().allowed);
        assert_eq!(peek_state.tat_ns, ns_since_epoch(now));
    }

    #[test]
    fn test_max_retries_from_burst() {
        let config = BucketParams::new(4, 1.0).unwrap();
        assert_eq!(GcraAlgorithm::max_retries(&config), 5);
    }
}
