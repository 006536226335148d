//! Jittered, capped exponential backoff driven by observed CAS feedback.
//!
//! `next_delay` is sawtooth: within each 8-attempt cycle the delay grows
//! exponentially (via the `<< (attempt mod 8)` shift), and every 8th attempt
//! the exponential multiplier resets while the linear `attempt+1` term keeps
//! climbing. This keeps delays bounded under sustained contention while still
//! spreading out retries.

use std::time::Duration;

use rand::Rng;

const MIN_FEEDBACK: Duration = Duration::from_nanos(30);
const MAX_FEEDBACK: Duration = Duration::from_secs(10);

fn clamp_feedback(feedback: Duration) -> Duration {
    feedback.clamp(MIN_FEEDBACK, MAX_FEEDBACK)
}

/// Compute the next backoff delay given the zero-based `attempt` number and
/// `feedback`, the latency observed from the most recent CAS round trip.
pub fn next_delay(attempt: u32, feedback: Duration) -> Duration {
    let feedback = clamp_feedback(feedback);

    let linear = (attempt as u64).saturating_add(1);
    let shift = (attempt % 8) as u32;
    let base_nanos = (feedback.as_nanos() as u64)
        .saturating_mul(linear)
        .saturating_shl(shift);

    let half = base_nanos / 2;
    let jitter = if half == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..half)
    };

    Duration::from_nanos(half.saturating_add(jitter))
}

/// Same as [`next_delay`] but with an explicit jitter source, for
/// deterministic testing of the `[base/2, base)` bound.
pub fn next_delay_with<R: Rng>(attempt: u32, feedback: Duration, rng: &mut R) -> Duration {
    let feedback = clamp_feedback(feedback);
    let linear = (attempt as u64).saturating_add(1);
    let shift = (attempt % 8) as u32;
    let base_nanos = (feedback.as_nanos() as u64)
        .saturating_mul(linear)
        .saturating_shl(shift);

    let half = base_nanos / 2;
    let jitter = if half == 0 { 0 } else { rng.gen_range(0..half) };
    Duration::from_nanos(half.saturating_add(jitter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_feedback_clamped() {
        // Below the floor and above the ceiling, the delay still comes out bounded.
        let low = next_delay_with(0, Duration::from_nanos(1), &mut StepRng::new(0, 1));
        let high = next_delay_with(0, Duration::from_secs(1000), &mut StepRng::new(0, 1));
        assert!(low <= Duration::from_nanos(MIN_FEEDBACK.as_nanos() as u64));
        assert!(high <= MAX_FEEDBACK);
    }

    #[test]
    fn test_delay_within_base_bounds() {
        let feedback = Duration::from_millis(10);
        for attempt in 0..16u32 {
            let mut rng_zero = StepRng::new(0, 0);
            let mut rng_max = StepRng::new(u64::MAX, 0);

            let at_zero_jitter = next_delay_with(attempt, feedback, &mut rng_zero);

            let linear = attempt as u64 + 1;
            let shift = attempt % 8;
            let base = (feedback.as_nanos() as u64) * linear << shift;
            let half = base / 2;

            assert_eq!(at_zero_jitter, Duration::from_nanos(half));

            let at_max_jitter = next_delay_with(attempt, feedback, &mut rng_max);
            assert!(at_max_jitter.as_nanos() as u64 >= half);
            assert!((at_max_jitter.as_nanos() as u64) < base.max(half + 1));
        }
    }

    #[test]
    fn test_sawtooth_resets_every_eight_attempts() {
        let feedback = Duration::from_millis(10);
        let mut rng = StepRng::new(0, 0);
        let d7 = next_delay_with(7, feedback, &mut rng);
        let d8 = next_delay_with(8, feedback, &mut rng);
        // attempt 8 restarts the shift at 0 but the linear term is now 9 vs 8,
        // so it need not exceed attempt 7's delay, confirming the "tooth" drop.
        assert!(d8 < d7);
    }

    #[test]
    fn test_delay_grows_within_a_cycle() {
        let feedback = Duration::from_millis(10);
        let mut rng = StepRng::new(0, 0);
        let mut prev = Duration::ZERO;
        for attempt in 0..8u32 {
            let d = next_delay_with(attempt, feedback, &mut rng);
            assert!(d >= prev, "attempt {attempt} delay {d:?} < prev {prev:?}");
            prev = d;
        }
    }
}
