//! The shared compare-and-swap retry loop driving every single-algorithm
//! operation.
//!
//! Every algorithm engine is a pure `step` function (see [`crate::algorithm`]);
//! this module owns the one piece of logic that differs between a correct
//! and an incorrect rate limiter under contention: reading current state,
//! evolving it, and writing it back only if nothing raced with us in
//! between. The dual-strategy orchestrator (`crate::dual`) re-implements
//! this loop over a composite state rather than reusing `run` directly,
//! since it must peek two engines before committing either.

use std::time::SystemTime;

use crate::algorithm::Algorithm;
use crate::backend::Backend;
use crate::backoff;
use crate::cancellation::Cancellation;
use crate::decision::Outcome;
use crate::error::{RateLimitError, Result};

/// Drive one Allow or Peek operation for algorithm `A` against `backend`.
///
/// When `consume` is `false` this is a pure read: no `Get`/`CheckAndSet`
/// round trip is even attempted beyond the initial `Get`, and the loop
/// always returns after one iteration.
pub async fn run<A: Algorithm, B: Backend>(
    backend: &B,
    key: &str,
    config: &A::Config,
    consume: bool,
    cancellation: Option<&Cancellation>,
    max_retries_override: Option<u32>,
) -> Result<Outcome> {
    let ttl = A::ttl(config);
    let max_retries = max_retries_override.unwrap_or_else(|| A::max_retries(config)).max(1);

    let mut attempt = 0u32;
    loop {
        let t_start = SystemTime::now();

        let raw = backend.get(key).await?;
        let state = raw.as_deref().map(A::decode).transpose()?;

        let now = SystemTime::now();
        let (results, new_state) = A::step(config, state, now, consume);
        let allowed = results.all_allowed();

        if !consume {
            return Ok(Outcome::new(allowed, results));
        }

        if raw.is_none() && !allowed {
            return Ok(Outcome::new(allowed, results));
        }

        let encoded = A::encode(&new_state);
        let swapped = backend
            .check_and_set(key, raw.as_deref(), encoded, ttl)
            .await?;

        if swapped {
            return Ok(Outcome::new(allowed, results));
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

/// Delete a fingerprint's state, algorithm-agnostic.
pub async fn reset<B: Backend>(backend: &B, key: &str) -> Result<()> {
    backend.delete(key).await?;
    Ok(())
}
