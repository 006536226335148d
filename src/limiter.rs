//! Public limiter facade: assembles a fingerprint, picks the configured
//! strategy (one algorithm, or a primary/secondary pair), and drives a
//! single CAS operation through [`crate::retry`] or [`crate::dual`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::algorithm::{FixedWindowAlgorithm, GcraAlgorithm, LeakyBucketAlgorithm, TokenBucketAlgorithm, MAX_RETRIES_CAP};
use crate::backend::Backend;
use crate::cancellation::Cancellation;
use crate::decision::Outcome;
use crate::dual;
use crate::error::{RateLimitError, Result};
use crate::key::{self, build_fingerprint, Role};
use crate::quota::{BucketParams, QuotaSet};
use crate::retry;

/// A single algorithm's configuration, chosen when the limiter is built.
#[derive(Debug, Clone)]
pub enum StrategyConfig {
    /// Multi-quota Fixed Window.
    FixedWindow(QuotaSet),
    /// Continuous-refill Token Bucket.
    TokenBucket(BucketParams),
    /// Continuous-drain Leaky Bucket.
    LeakyBucket(BucketParams),
    /// Single-timestamp GCRA.
    Gcra(BucketParams),
}

/// Options accompanying an Allow/Peek/Reset call.
#[derive(Debug, Clone, Copy)]
pub struct AllowOptions<'a> {
    /// Caller-specific dynamic key component (e.g. a user or IP).
    pub dynamic_key: &'a str,
    /// Skip charset validation of `dynamic_key` (length is still enforced).
    pub skip_dynamic_validation: bool,
}

impl<'a> AllowOptions<'a> {
    /// Options for `dynamic_key` with validation enabled.
    pub fn new(dynamic_key: &'a str) -> Self {
        Self {
            dynamic_key,
            skip_dynamic_validation: false,
        }
    }

    /// Skip dynamic-key charset validation.
    pub fn skip_validation(mut self) -> Self {
        self.skip_dynamic_validation = true;
        self
    }
}

/// Builder for a [`RateLimiter`], mirroring the quota builder's
/// `try_new`/`build() -> Result<T>` idiom.
pub struct RateLimiterBuilder<B> {
    backend: B,
    base_key: Option<String>,
    primary: Option<StrategyConfig>,
    secondary: Option<StrategyConfig>,
    max_retries_override: Option<u32>,
}

impl<B: Backend> RateLimiterBuilder<B> {
    /// Start building a limiter over `backend`.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            base_key: None,
            primary: None,
            secondary: None,
            max_retries_override: None,
        }
    }

    /// Set the base key namespacing every fingerprint this limiter assembles.
    pub fn base_key(mut self, base_key: impl Into<String>) -> Self {
        self.base_key = Some(base_key.into());
        self
    }

    /// Set the primary strategy.
    pub fn primary(mut self, config: StrategyConfig) -> Self {
        self.primary = Some(config);
        self
    }

    /// Add a secondary strategy, switching this limiter to dual-strategy mode.
    pub fn secondary(mut self, config: StrategyConfig) -> Self {
        self.secondary = Some(config);
        self
    }

    /// Override the auto-derived `max_retries` budget, capped at
    /// [`MAX_RETRIES_CAP`].
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries_override = Some(max_retries.min(MAX_RETRIES_CAP));
        self
    }

    /// Validate and construct the limiter.
    pub fn build(self) -> Result<RateLimiter<B>> {
        let base_key = self
            .base_key
            .ok_or_else(|| RateLimitError::validation("base_key is required"))?;
        key::validate_component(&base_key)?;
        let primary = self
            .primary
            .ok_or_else(|| RateLimitError::validation("a primary strategy is required"))?;

        Ok(RateLimiter {
            backend: Arc::new(self.backend),
            base_key,
            primary,
            secondary: self.secondary,
            max_retries_override: self.max_retries_override,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// A configured rate limiter over backend `B`.
///
/// Cheaply cloneable: the backend, strategy configuration, and close guard
/// are all shared behind `Arc`, so a clone and its original close exactly
/// once between them.
pub struct RateLimiter<B> {
    backend: Arc<B>,
    base_key: String,
    primary: StrategyConfig,
    secondary: Option<StrategyConfig>,
    max_retries_override: Option<u32>,
    closed: Arc<AtomicBool>,
}

impl<B> Clone for RateLimiter<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            base_key: self.base_key.clone(),
            primary: self.primary.clone(),
            secondary: self.secondary.clone(),
            max_retries_override: self.max_retries_override,
            closed: self.closed.clone(),
        }
    }
}

impl<B: Backend> RateLimiter<B> {
    fn fingerprint(&self, opts: &AllowOptions<'_>) -> Result<String> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RateLimitError::validation("limiter is closed"));
        }
        build_fingerprint(
            &self.base_key,
            opts.dynamic_key,
            opts.skip_dynamic_validation,
            Role::None,
        )
    }

    async fn drive(
        &self,
        opts: &AllowOptions<'_>,
        consume: bool,
        cancellation: Option<&Cancellation>,
    ) -> Result<Outcome> {
        let key = self.fingerprint(opts)?;
        match &self.secondary {
            None => {
                single(
                    &self.backend,
                    &key,
                    &self.primary,
                    consume,
                    cancellation,
                    self.max_retries_override,
                )
                .await
            }
            Some(secondary) => {
                dual_dispatch(
                    &self.backend,
                    &key,
                    &self.primary,
                    secondary,
                    consume,
                    cancellation,
                    self.max_retries_override,
                )
                .await
            }
        }
    }

    /// Consume quota, returning whether the request was allowed and the
    /// per-quota detail behind that decision.
    pub async fn allow(
        &self,
        opts: &AllowOptions<'_>,
        cancellation: Option<&Cancellation>,
    ) -> Result<Outcome> {
        self.drive(opts, true, cancellation).await
    }

    /// Evaluate the request without consuming quota.
    pub async fn peek(
        &self,
        opts: &AllowOptions<'_>,
        cancellation: Option<&Cancellation>,
    ) -> Result<Outcome> {
        self.drive(opts, false, cancellation).await
    }

    /// Remove a fingerprint's state entirely.
    pub async fn reset(&self, opts: &AllowOptions<'_>) -> Result<()> {
        let key = self.fingerprint(opts)?;
        if self.secondary.is_some() {
            dual::reset(&self.backend, &key).await
        } else {
            retry::reset(&self.backend, &key).await
        }
    }

    /// Release the backend. Idempotent: a second call on this or a cloned
    /// handle is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.backend.close().await
    }
}

async fn single<B: Backend>(
    backend: &B,
    key: &str,
    config: &StrategyConfig,
    consume: bool,
    cancellation: Option<&Cancellation>,
    max_retries_override: Option<u32>,
) -> Result<Outcome> {
    match config {
        StrategyConfig::FixedWindow(c) => {
            retry::run::<FixedWindowAlgorithm, _>(backend, key, c, consume, cancellation, max_retries_override)
                .await
        }
        StrategyConfig::TokenBucket(c) => {
            retry::run::<TokenBucketAlgorithm, _>(backend, key, c, consume, cancellation, max_retries_override)
                .await
        }
        StrategyConfig::LeakyBucket(c) => {
            retry::run::<LeakyBucketAlgorithm, _>(backend, key, c, consume, cancellation, max_retries_override)
                .await
        }
        StrategyConfig::Gcra(c) => {
            retry::run::<GcraAlgorithm, _>(backend, key, c, consume, cancellation, max_retries_override).await
        }
    }
}

/// Dispatches over all 16 primary/secondary algorithm pairings. Every
/// algorithm advertises both "can be primary" and "can be secondary", so no
/// pairing is rejected here (see `DESIGN.md`).
async fn dual_dispatch<B: Backend>(
    backend: &B,
    key: &str,
    primary: &StrategyConfig,
    secondary: &StrategyConfig,
    consume: bool,
    cancellation: Option<&Cancellation>,
    max_retries_override: Option<u32>,
) -> Result<Outcome> {
    use StrategyConfig::{FixedWindow, Gcra, LeakyBucket, TokenBucket};

    macro_rules! dispatch {
        ($p:ty, $pc:expr, $s:ty, $sc:expr) => {
            dual::run::<$p, $s, _>(backend, key, $pc, $sc, consume, cancellation, max_retries_override).await
        };
    }

    match (primary, secondary) {
        (FixedWindow(p), FixedWindow(s)) => dispatch!(FixedWindowAlgorithm, p, FixedWindowAlgorithm, s),
        (FixedWindow(p), TokenBucket(s)) => dispatch!(FixedWindowAlgorithm, p, TokenBucketAlgorithm, s),
        (FixedWindow(p), LeakyBucket(s)) => dispatch!(FixedWindowAlgorithm, p, LeakyBucketAlgorithm, s),
        (FixedWindow(p), Gcra(s)) => dispatch!(FixedWindowAlgorithm, p, GcraAlgorithm, s),
        (TokenBucket(p), FixedWindow(s)) => dispatch!(TokenBucketAlgorithm, p, FixedWindowAlgorithm, s),
        (TokenBucket(p), TokenBucket(s)) => dispatch!(TokenBucketAlgorithm, p, TokenBucketAlgorithm, s),
        (TokenBucket(p), LeakyBucket(s)) => dispatch!(TokenBucketAlgorithm, p, LeakyBucketAlgorithm, s),
        (TokenBucket(p), Gcra(s)) => dispatch!(TokenBucketAlgorithm, p, GcraAlgorithm, s),
        (LeakyBucket(p), FixedWindow(s)) => dispatch!(LeakyBucketAlgorithm, p, FixedWindowAlgorithm, s),
        (LeakyBucket(p), TokenBucket(s)) => dispatch!(LeakyBucketAlgorithm, p, TokenBucketAlgorithm, s),
        (LeakyBucket(p), LeakyBucket(s)) => dispatch!(LeakyBucketAlgorithm, p, LeakyBucketAlgorithm, s),
        (LeakyBucket(p), Gcra(s)) => dispatch!(LeakyBucketAlgorithm, p, GcraAlgorithm, s),
        (Gcra(p), FixedWindow(s)) => dispatch!(GcraAlgorithm, p, FixedWindowAlgorithm, s),
        (Gcra(p), TokenBucket(s)) => dispatch!(GcraAlgorithm, p, TokenBucketAlgorithm, s),
        (Gcra(p), LeakyBucket(s)) => dispatch!(GcraAlgorithm, p, LeakyBucketAlgorithm, s),
        (Gcra(p), Gcra(s)) => dispatch!(GcraAlgorithm, p, GcraAlgorithm, s),
    }
}
