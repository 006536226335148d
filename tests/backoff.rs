//! Black-box coverage of the public backoff surface: jittered delays stay
//! bounded and respond to observed feedback the way the retry driver relies
//! on them to.

use ocra_ratelimit::backoff::next_delay;
use std::time::Duration;

#[test]
fn test_delay_never_exceeds_feedback_times_linear_and_shift() {
    let feedback = Duration::from_millis(5);
    for attempt in 0..16u32 {
        let linear = attempt as u64 + 1;
        let shift = attempt % 8;
        let base = (feedback.as_nanos() as u64) * linear << shift;
        let delay = next_delay(attempt, feedback);
        assert!(
            (delay.as_nanos() as u64) < base.max(1),
            "attempt {attempt}: delay {delay:?} exceeded base bound {base}ns"
        );
    }
}

#[test]
fn test_delay_is_never_zero_for_nonzero_feedback() {
    let feedback = Duration::from_millis(1);
    for attempt in 0..8u32 {
        assert!(next_delay(attempt, feedback) > Duration::ZERO);
    }
}

#[test]
fn test_tiny_feedback_is_floored() {
    // Feedback below the minimum floor still produces a small, bounded delay
    // rather than collapsing to zero or panicking on underflow.
    let delay = next_delay(0, Duration::from_nanos(1));
    assert!(delay < Duration::from_millis(1));
}

#[test]
fn test_huge_feedback_does_not_overflow() {
    // Feedback far above the ceiling is clamped before the shift/multiply
    // chain runs, so this must return promptly with a finite delay rather
    // than panicking on overflow.
    let delay = next_delay(7, Duration::from_secs(10_000));
    assert!(delay < Duration::from_secs(86_400));
}
