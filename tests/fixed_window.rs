//! End-to-end Fixed Window scenarios driven through the public limiter.

use ocra_ratelimit::{AllowOptions, MemoryBackend, QuotaSetBuilder, RateLimiterBuilder, StrategyConfig};
use std::time::Duration;

#[tokio::test]
async fn test_single_quota_exhaustion() {
    let quotas = QuotaSetBuilder::new()
        .quota("minute", 3, Duration::from_secs(60))
        .unwrap()
        .build()
        .unwrap();

    let limiter = RateLimiterBuilder::new(MemoryBackend::new())
        .base_key("login")
        .primary(StrategyConfig::FixedWindow(quotas))
        .build()
        .unwrap();

    let opts = AllowOptions::new("ip:10.0.0.1");
    for i in 1..=3 {
        let outcome = limiter.allow(&opts, None).await.unwrap();
        assert!(outcome.allowed, "request {i} should be allowed");
    }

    let outcome = limiter.allow(&opts, None).await.unwrap();
    assert!(!outcome.allowed);
    assert_eq!(outcome.results.get("minute").unwrap().remaining, 0);
}

#[tokio::test]
async fn test_multi_quota_most_restrictive_wins() {
    let quotas = QuotaSetBuilder::new()
        .quota("minute", 2, Duration::from_secs(60))
        .unwrap()
        .quota("hour", 100, Duration::from_secs(3600))
        .unwrap()
        .build()
        .unwrap();

    let limiter = RateLimiterBuilder::new(MemoryBackend::new())
        .base_key("upload")
        .primary(StrategyConfig::FixedWindow(quotas))
        .build()
        .unwrap();

    let opts = AllowOptions::new("user:42");
    assert!(limiter.allow(&opts, None).await.unwrap().allowed);
    assert!(limiter.allow(&opts, None).await.unwrap().allowed);

    let outcome = limiter.allow(&opts, None).await.unwrap();
    assert!(!outcome.allowed, "minute quota should have denied despite hour headroom");
    assert!(!outcome.results.get("minute").unwrap().allowed);
    assert!(outcome.results.get("hour").unwrap().allowed);
    assert_eq!(outcome.results.get("hour").unwrap().remaining, 98);
}

#[tokio::test]
async fn test_fingerprints_are_independent_per_dynamic_key() {
    let quotas = QuotaSetBuilder::new()
        .quota("minute", 1, Duration::from_secs(60))
        .unwrap()
        .build()
        .unwrap();

    let limiter = RateLimiterBuilder::new(MemoryBackend::new())
        .base_key("signup")
        .primary(StrategyConfig::FixedWindow(quotas))
        .build()
        .unwrap();

    assert!(limiter.allow(&AllowOptions::new("tenant:a"), None).await.unwrap().allowed);
    assert!(limiter.allow(&AllowOptions::new("tenant:b"), None).await.unwrap().allowed);
    assert!(!limiter.allow(&AllowOptions::new("tenant:a"), None).await.unwrap().allowed);
}

#[tokio::test]
async fn test_reset_reopens_the_window_early() {
    let quotas = QuotaSetBuilder::new()
        .quota("minute", 1, Duration::from_secs(60))
        .unwrap()
        .build()
        .unwrap();

    let limiter = RateLimiterBuilder::new(MemoryBackend::new())
        .base_key("signup")
        .primary(StrategyConfig::FixedWindow(quotas))
        .build()
        .unwrap();

    let opts = AllowOptions::new("tenant:a");
    assert!(limiter.allow(&opts, None).await.unwrap().allowed);
    assert!(!limiter.allow(&opts, None).await.unwrap().allowed);

    limiter.reset(&opts).await.unwrap();
    assert!(limiter.allow(&opts, None).await.unwrap().allowed);
}
