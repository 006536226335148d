//! Rate limiting core: Fixed Window, Token Bucket, Leaky Bucket, and GCRA
//! over a pluggable compare-and-swap backend, with dual-strategy
//! composition and failover.
//!
//! `ocra-ratelimit` treats the optimistic-concurrency protocol as the hard
//! part: every algorithm is a pure state-machine step, and one shared CAS
//! retry loop (with jittered, capped backoff) makes all of them safe under
//! contention and portable across very different storage engines.
//!
//! # Quick start
//!
//! ```no_run
//! use ocra_ratelimit::{AllowOptions, MemoryBackend, QuotaSetBuilder, RateLimiterBuilder, StrategyConfig};
//! use std::time::Duration;
//!
//! # async fn run() -> ocra_ratelimit::Result<()> {
//! let quotas = QuotaSetBuilder::new()
//!     .quota("minute", 100, Duration::from_secs(60))?
//!     .build()?;
//!
//! let limiter = RateLimiterBuilder::new(MemoryBackend::new())
//!     .base_key("api")
//!     .primary(StrategyConfig::FixedWindow(quotas))
//!     .build()?;
//!
//! let outcome = limiter.allow(&AllowOptions::new("user:123"), None).await?;
//! if outcome.allowed {
//!     println!("allowed, {} remaining", outcome.results.default_quota().unwrap().remaining);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Algorithms
//!
//! | Algorithm | Shape | Module |
//! |-----------|-------|--------|
//! | Fixed Window | Multi-quota counters | [`algorithm::FixedWindowAlgorithm`] |
//! | Token Bucket | Continuous refill | [`algorithm::TokenBucketAlgorithm`] |
//! | Leaky Bucket | Continuous drain | [`algorithm::LeakyBucketAlgorithm`] |
//! | GCRA | Single timestamp, spaced arrivals | [`algorithm::GcraAlgorithm`] |
//!
//! # Feature flags
//!
//! - `memory` (default): in-memory backend (`DashMap` + background GC) and
//!   the failover backend, which always wraps an in-memory secondary.
//! - `redis`: Redis backend via `deadpool-redis`.
//! - `postgres`: PostgreSQL backend via `sqlx`.
//! - `full`: all of the above.

pub mod algorithm;
pub mod backend;
pub mod backoff;
pub mod cancellation;
pub mod circuit;
pub mod codec;
pub mod decision;
pub mod dual;
pub mod error;
pub mod health;
pub mod key;
pub mod limiter;
pub mod quota;
pub mod retry;

pub use algorithm::{Algorithm, FixedWindowAlgorithm, GcraAlgorithm, LeakyBucketAlgorithm, TokenBucketAlgorithm};
pub use backend::Backend;
pub use cancellation::Cancellation;
pub use circuit::{BreakerState, CircuitBreaker, CircuitConfig};
pub use decision::{Outcome, QuotaResult, ResultSink};
pub use error::{BackendError, RateLimitError, Result};
pub use health::{HealthChecker, HealthConfig};
pub use limiter::{AllowOptions, RateLimiter, RateLimiterBuilder, StrategyConfig};
pub use quota::{BucketParams, Quota, QuotaSet, QuotaSetBuilder};

#[cfg(feature = "memory")]
pub use backend::{FailoverBackend, FailoverConfig, FailoverEligible, GcConfig, GcInterval, MemoryBackend};

#[cfg(feature = "redis")]
pub use backend::{RedisBackend, RedisConfig};

#[cfg(feature = "postgres")]
pub use backend::{PostgresBackend, PostgresConfig};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::algorithm::Algorithm;
    pub use crate::decision::{Outcome, QuotaResult, ResultSink};
    pub use crate::error::{RateLimitError, Result};
    pub use crate::limiter::{AllowOptions, RateLimiter, RateLimiterBuilder, StrategyConfig};
    pub use crate::quota::{BucketParams, QuotaSet, QuotaSetBuilder};

    #[cfg(feature = "memory")]
    pub use crate::backend::{FailoverBackend, MemoryBackend};

    #[cfg(feature = "redis")]
    pub use crate::backend::RedisBackend;

    #[cfg(feature = "postgres")]
    pub use crate::backend::PostgresBackend;
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_integration_fixed_window() {
        let quotas = QuotaSetBuilder::new()
            .quota("minute", 2, Duration::from_secs(60))
            .unwrap()
            .build()
            .unwrap();

        let limiter = RateLimiterBuilder::new(MemoryBackend::new())
            .base_key("api")
            .primary(StrategyConfig::FixedWindow(quotas))
            .build()
            .unwrap();

        let opts = AllowOptions::new("user:1");
        assert!(limiter.allow(&opts, None).await.unwrap().allowed);
        assert!(limiter.allow(&opts, None).await.unwrap().allowed);
        assert!(!limiter.allow(&opts, None).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_integration_token_bucket() {
        let limiter = RateLimiterBuilder::new(MemoryBackend::new())
            .base_key("api")
            .primary(StrategyConfig::TokenBucket(BucketParams::new(10, 1.0).unwrap()))
            .build()
            .unwrap();

        let outcome = limiter.allow(&AllowOptions::new("user:1"), None).await.unwrap();
        assert!(outcome.allowed);
        assert_eq!(outcome.results.default_quota().unwrap().remaining, 9);
    }

    #[tokio::test]
    async fn test_integration_gcra_burst_then_deny() {
        let limiter = RateLimiterBuilder::new(MemoryBackend::new())
            .base_key("api")
            .primary(StrategyConfig::Gcra(BucketParams::new(5, 1.0).unwrap()))
            .build()
            .unwrap();

        let opts = AllowOptions::new("user:1");
        for i in 1..=5 {
            assert!(
                limiter.allow(&opts, None).await.unwrap().allowed,
                "request {i} should be allowed"
            );
        }
        assert!(!limiter.allow(&opts, None).await.unwrap().allowed);
    }
}
