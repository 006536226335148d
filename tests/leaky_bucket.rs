//! End-to-end Leaky Bucket scenarios: queue fills, then drains over time.

use ocra_ratelimit::{AllowOptions, BucketParams, MemoryBackend, RateLimiterBuilder, StrategyConfig};
use std::time::Duration;

#[tokio::test]
async fn test_fills_then_drains_over_real_time() {
    let limiter = RateLimiterBuilder::new(MemoryBackend::new())
        .base_key("webhook")
        .primary(StrategyConfig::LeakyBucket(BucketParams::new(2, 20.0).unwrap()))
        .build()
        .unwrap();

    let opts = AllowOptions::new("endpoint:1");
    assert!(limiter.allow(&opts, None).await.unwrap().allowed);
    assert!(limiter.allow(&opts, None).await.unwrap().allowed);
    assert!(!limiter.allow(&opts, None).await.unwrap().allowed);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(limiter.allow(&opts, None).await.unwrap().allowed);
}

#[tokio::test]
async fn test_independent_fingerprints_have_separate_queues() {
    let limiter = RateLimiterBuilder::new(MemoryBackend::new())
        .base_key("webhook")
        .primary(StrategyConfig::LeakyBucket(BucketParams::new(1, 1.0).unwrap()))
        .build()
        .unwrap();

    assert!(limiter.allow(&AllowOptions::new("endpoint:1"), None).await.unwrap().allowed);
    assert!(!limiter.allow(&AllowOptions::new("endpoint:1"), None).await.unwrap().allowed);
    assert!(limiter.allow(&AllowOptions::new("endpoint:2"), None).await.unwrap().allowed);
}
