//! Fixed Window engine: independent counters per quota, reset when their
//! window elapses, written back together so increments stay consistent
//! across quotas.

use std::time::{Duration, SystemTime};

use crate::codec::fixed_window::{FixedWindowState, QuotaCounter};
use crate::decision::{QuotaResult, ResultSink};
use crate::error::BackendError;
use crate::quota::QuotaSet;

use super::{capped_retries, ns_since_epoch, system_time_from_ns, Algorithm};

/// Multi-quota fixed window engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedWindowAlgorithm;

impl Algorithm for FixedWindowAlgorithm {
    type Config = QuotaSet;
    type State = FixedWindowState;

    const NAME: &'static str = "fixed_window";

    fn decode(raw: &str) -> Result<Self::State, BackendError> {
        FixedWindowState::decode(raw)
    }

    fn encode(state: &Self::State) -> String {
        state.encode()
    }

    fn ttl(config: &Self::Config) -> Duration {
        (config.max_window() * 5).max(Duration::from_secs(1))
    }

    fn max_retries(config: &Self::Config) -> u32 {
        capped_retries(config.min_limit() + 1)
    }

    fn step(
        config: &Self::Config,
        state: Option<Self::State>,
        now: SystemTime,
        consume: bool,
    ) -> (ResultSink, Self::State) {
        let now_ns = ns_since_epoch(now);
        let prior = state.map(|s| s.counters).unwrap_or_default();

        let mut counters = Vec::with_capacity(config.len());
        let mut results = ResultSink::new();
        let mut overall_allow = true;

        for quota in config.iter() {
            let window_ns = quota.window().as_nanos() as i64;
            let (mut count, mut start_ns) = prior
                .iter()
                .find(|c| c.name == quota.name())
                .map(|c| (c.count, c.start_ns))
                .unwrap_or((0, now_ns));

            if now_ns - start_ns >= window_ns {
                start_ns = now_ns;
                count = 0;
            }

            let allow = count < quota.limit();
            overall_allow &= allow;

            counters.push(QuotaCounter {
                name: quota.name().to_string(),
                count,
                start_ns,
            });
            let remaining = quota.limit().saturating_sub(count);
            results.insert(
                quota.name(),
                QuotaResult::new(allow, remaining, system_time_from_ns(start_ns + window_ns)),
            );
        }

        if overall_allow && consume {
            for (counter, quota) in counters.iter_mut().zip(config.iter()) {
                counter.count += 1;
                let remaining = quota.limit().saturating_sub(counter.count);
                let window_ns = quota.window().as_nanos() as i64;
                results.insert(
                    quota.name(),
                    QuotaResult::new(true, remaining, system_time_from_ns(counter.start_ns + window_ns)),
                );
            }
        }

        (results, FixedWindowState { counters })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::QuotaSetBuilder;
    use std::time::UNIX_EPOCH;

    fn single_quota(limit: u64, window: Duration) -> QuotaSet {
        QuotaSetBuilder::default()
            .quota("default", limit, window)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_allows_up_to_limit_then_denies() {
        let config = single_quota(3, Duration::from_secs(60));
        let now = UNIX_EPOCH + Duration::from_secs(1000);

        let mut state = None;
        for _ in 0..3 {
            let (results, next) = FixedWindowAlgorithm::step(&config, state, now, true);
            assert!(results.all_allowed());
            state = Some(next);
        }

        let (results, _) = FixedWindowAlgorithm::step(&config, state, now, true);
        assert!(!results.all_allowed());
    }

    #[test]
    fn test_window_resets_after_elapsed() {
        let config = single_quota(1, Duration::from_secs(10));
        let now = UNIX_EPOCH + Duration::from_secs(1000);

        let (_, state) = FixedWindowAlgorithm::step(&config, None, now, true);
        let (results, state) = FixedWindowAlgorithm::step(&config, Some(state), now, true);
        assert!(!results.all_allowed());

        let later = now + Duration::from_secs(11);
        let (results, _) = FixedWindowAlgorithm::step(&config, Some(state), later, true);
        assert!(results.all_allowed());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let config = single_quota(1, Duration::from_secs(60));
        let now = UNIX_EPOCH + Duration::from_secs(1000);

        let (peek_results, peek_state) = FixedWindowAlgorithm::step(&config, None, now, false);
        assert!(peek_results.all_allowed());
        assert_eq!(peek_state.counters[0].count, 0);

        let (results, _) = FixedWindowAlgorithm::step(&config, None, now, true);
        assert!(results.all_allowed());
    }

    #[test]
    fn test_multi_quota_requires_all_to_allow() {
        let config = QuotaSetBuilder::default()
            .quota("minute", 2, Duration::from_secs(60))
            .unwrap()
            .quota("hour", 5, Duration::from_secs(3600))
            .unwrap()
            .build()
            .unwrap();
        let now = UNIX_EPOCH + Duration::from_secs(1000);

        let mut state = None;
        for _ in 0..2 {
            let (results, next) = FixedWindowAlgorithm::step(&config, state, now, true);
            assert!(results.all_allowed());
            state = Some(next);
        }

        // minute quota is exhausted even though hour quota has headroom.
        let (results, next) = FixedWindowAlgorithm::step(&config, state, now, true);
        assert!(!results.all_allowed());
        assert!(!results.get("minute").unwrap().allowed);
        assert!(results.get("hour").unwrap().allowed);
        // denied overall: hour counter must not have been incremented.
        assert_eq!(next.counters.iter().find(|c| c.name == "hour").unwrap().count, 2);
    }

    #[test]
    fn test_max_retries_from_min_limit() {
        let config = QuotaSetBuilder::default()
            .quota("minute", 10, Duration::from_secs(60))
            .unwrap()
            .quota("hour", 3, Duration::from_secs(3600))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(FixedWindowAlgorithm::max_retries(&config), 4);
    }
}
