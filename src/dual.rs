//! Dual-strategy orchestrator: consumes quota from two independent
//! algorithms atomically, or from neither.
//!
//! A single composite key holds both sub-states so one `CheckAndSet` swaps
//! them together. Before any write is attempted, both engines are peeked:
//! if either would deny, the whole operation denies and nothing is
//! mutated. This is what prevents the "secondary denies after primary
//! already decremented" bug that a naive two-call implementation has.

use std::time::SystemTime;

use crate::algorithm::Algorithm;
use crate::backend::Backend;
use crate::backoff;
use crate::cancellation::Cancellation;
use crate::codec::CompositeState;
use crate::decision::{Outcome, ResultSink, PRIMARY_PREFIX, SECONDARY_PREFIX};
use crate::error::{RateLimitError, Result};

fn merge_prefixed(into: &mut ResultSink, prefix: &str, from: &ResultSink) {
    for (name, result) in from.iter() {
        into.insert(format!("{prefix}{name}"), *result);
    }
}

/// Drive one Allow or Peek operation across a primary/secondary pair of
/// algorithms sharing a composite key.
pub async fn run<P: Algorithm, S: Algorithm, B: Backend>(
    backend: &B,
    key: &str,
    primary_config: &P::Config,
    secondary_config: &S::Config,
    consume: bool,
    cancellation: Option<&Cancellation>,
    max_retries_override: Option<u32>,
) -> Result<Outcome> {
    let ttl = P::ttl(primary_config).max(S::ttl(secondary_config));
    let max_retries = max_retries_override
        .unwrap_or_else(|| P::max_retries(primary_config).min(S::max_retries(secondary_config)))
        .max(1);

    let mut attempt = 0u32;
    loop {
        let t_start = SystemTime::now();

        let raw = backend.get(key).await?;
        let (primary_raw, secondary_raw) = match raw.as_deref() {
            Some(raw) => {
                let composite = CompositeState::decode(raw)?;
                (Some(composite.primary), Some(composite.secondary))
            }
            None => (None, None),
        };

        let primary_state = primary_raw.as_deref().map(P::decode).transpose()?;
        let secondary_state = secondary_raw.as_deref().map(S::decode).transpose()?;

        let now = SystemTime::now();

        let (primary_peek, _) = P::step(primary_config, primary_state.clone(), now, false);
        let mut results = ResultSink::new();
        merge_prefixed(&mut results, PRIMARY_PREFIX, &primary_peek);
        if !primary_peek.all_allowed() {
            return Ok(Outcome::new(false, results));
        }

        let (secondary_peek, _) = S::step(secondary_config, secondary_state.clone(), now, false);
        merge_prefixed(&mut results, SECONDARY_PREFIX, &secondary_peek);
        if !secondary_peek.all_allowed() {
            return Ok(Outcome::new(false, results));
        }

        if !consume {
            return Ok(Outcome::new(true, results));
        }

        let (primary_results, primary_next) = P::step(primary_config, primary_state, now, true);
        let (secondary_results, secondary_next) =
            S::step(secondary_config, secondary_state, now, true);

        let mut final_results = ResultSink::new();
        merge_prefixed(&mut final_results, PRIMARY_PREFIX, &primary_results);
        merge_prefixed(&mut final_results, SECONDARY_PREFIX, &secondary_results);

        let composite = CompositeState {
            primary: P::encode(&primary_next),
            secondary: S::encode(&secondary_next),
        };
        let swapped = backend
            .check_and_set(key, raw.as_deref(), composite.encode(), ttl)
            .await?;

        if swapped {
            return Ok(Outcome::new(true, final_results));
        }

        attempt += 1;
        if attempt >= max_retries {
            return Err(RateLimitError::Contention { attempts: attempt });
        }

        let feedback = SystemTime::now()
            .duration_since(t_start)
            .unwrap_or(std::time::Duration::from_nanos(1));
        let delay = backoff::next_delay(attempt - 1, feedback);

        if let Some(cancellation) = cancellation {
            if cancellation.sleep_cancellable(delay).await {
                return Err(RateLimitError::Cancelled);
            }
        } else {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Delete the composite state for a fingerprint.
pub async fn reset<B: Backend>(backend: &B, key: &str) -> Result<()> {
    backend.delete(key).await?;
    Ok(())
}
