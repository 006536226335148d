//! Integration tests for quota and bucket-parameter construction.

use ocra_ratelimit::{BucketParams, QuotaSetBuilder};
use std::time::Duration;

#[test]
fn test_quota_set_single_quota() {
    let quotas = QuotaSetBuilder::new()
        .quota("minute", 100, Duration::from_secs(60))
        .unwrap()
        .build()
        .unwrap();

    let q = quotas.get("minute").unwrap();
    assert_eq!(q.limit(), 100);
    assert_eq!(q.window(), Duration::from_secs(60));
}

#[test]
fn test_quota_set_multi_quota_preserves_order() {
    let quotas = QuotaSetBuilder::new()
        .quota("minute", 100, Duration::from_secs(60))
        .unwrap()
        .quota("hour", 1000, Duration::from_secs(3600))
        .unwrap()
        .build()
        .unwrap();

    let names: Vec<_> = quotas.iter().map(|q| q.name()).collect();
    assert_eq!(names, vec!["minute", "hour"]);
}

#[test]
fn test_quota_rejects_zero_limit() {
    let result = QuotaSetBuilder::new().quota("minute", 0, Duration::from_secs(60));
    assert!(result.is_err());
}

#[test]
fn test_quota_rejects_window_below_minimum() {
    let result = QuotaSetBuilder::new().quota("minute", 10, Duration::from_secs(1));
    assert!(result.is_err());
}

#[test]
fn test_quota_set_rejects_empty() {
    assert!(QuotaSetBuilder::new().build().is_err());
}

#[test]
fn test_bucket_params_burst_and_rate() {
    let params = BucketParams::new(50, 10.0).unwrap();
    assert_eq!(params.burst(), 50);
    assert_eq!(params.rate(), 10.0);
    assert_eq!(params.emission_interval(), Duration::from_millis(100));
}

#[test]
fn test_bucket_params_rejects_zero_burst() {
    assert!(BucketParams::new(0, 10.0).is_err());
}

#[test]
fn test_bucket_params_rejects_non_positive_rate() {
    assert!(BucketParams::new(10, 0.0).is_err());
    assert!(BucketParams::new(10, -1.0).is_err());
}
