//! End-to-end Token Bucket scenarios: burst exhaustion followed by
//! real-time refill.

use ocra_ratelimit::{AllowOptions, BucketParams, MemoryBackend, RateLimiterBuilder, StrategyConfig};
use std::time::Duration;

#[tokio::test]
async fn test_burst_then_refill_over_real_time() {
    let limiter = RateLimiterBuilder::new(MemoryBackend::new())
        .base_key("search")
        .primary(StrategyConfig::TokenBucket(BucketParams::new(2, 20.0).unwrap()))
        .build()
        .unwrap();

    let opts = AllowOptions::new("user:1");
    assert!(limiter.allow(&opts, None).await.unwrap().allowed);
    assert!(limiter.allow(&opts, None).await.unwrap().allowed);
    assert!(!limiter.allow(&opts, None).await.unwrap().allowed);

    // 20 tokens/sec: waiting 100ms refills roughly 2 tokens.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(limiter.allow(&opts, None).await.unwrap().allowed);
}

#[tokio::test]
async fn test_peek_reports_without_consuming() {
    let limiter = RateLimiterBuilder::new(MemoryBackend::new())
        .base_key("search")
        .primary(StrategyConfig::TokenBucket(BucketParams::new(1, 1.0).unwrap()))
        .build()
        .unwrap();

    let opts = AllowOptions::new("user:1");
    let peeked = limiter.peek(&opts, None).await.unwrap();
    assert!(peeked.allowed);

    let consumed = limiter.allow(&opts, None).await.unwrap();
    assert!(consumed.allowed);

    let peeked_after = limiter.peek(&opts, None).await.unwrap();
    assert!(!peeked_after.allowed);
}
