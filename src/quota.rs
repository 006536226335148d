//! Quota configuration for the Fixed Window algorithm, and the shared
//! burst/rate parameters used by the continuous-accounting algorithms
//! (Token Bucket, Leaky Bucket, GCRA).

use std::time::Duration;

use crate::error::{RateLimitError, Result};

/// Minimum window accepted by a Fixed Window quota.
pub const MIN_WINDOW: Duration = Duration::from_secs(5);
/// Maximum number of quotas in a single Fixed Window fingerprint.
pub const MAX_QUOTAS: usize = 8;
/// Maximum length of a quota name.
pub const MAX_NAME_LEN: usize = 16;

/// A single Fixed Window dimension: `(name, limit, window)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quota {
    name: String,
    limit: u64,
    window: Duration,
}

impl Quota {
    /// Create a new named quota, validating name/limit/window.
    pub fn new(name: impl Into<String>, limit: u64, window: Duration) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(RateLimitError::validation(format!(
                "quota name length must be 1..={MAX_NAME_LEN}, got {}",
                name.len()
            )));
        }
        crate::key::validate_component(&name)?;
        if limit == 0 {
            return Err(RateLimitError::validation("quota limit must be > 0"));
        }
        if window < MIN_WINDOW {
            return Err(RateLimitError::validation(format!(
                "quota window must be >= {MIN_WINDOW:?}, got {window:?}"
            )));
        }
        Ok(Self {
            name,
            limit,
            window,
        })
    }

    /// Quota name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum requests allowed per window.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Window duration.
    pub fn window(&self) -> Duration {
        self.window
    }
}

/// An ordered, deterministic set of up to [`MAX_QUOTAS`] quotas sharing one
/// Fixed Window fingerprint. Iteration order is insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuotaSet {
    quotas: Vec<Quota>,
}

impl QuotaSet {
    /// Build a quota set from an ordered list, rejecting duplicates, overflow,
    /// and an empty set.
    pub fn new(quotas: Vec<Quota>) -> Result<Self> {
        if quotas.is_empty() {
            return Err(RateLimitError::validation(
                "fixed window requires at least one quota",
            ));
        }
        if quotas.len() > MAX_QUOTAS {
            return Err(RateLimitError::validation(format!(
                "at most {MAX_QUOTAS} quotas are allowed, got {}",
                quotas.len()
            )));
        }
        let mut seen = std::collections::HashSet::with_capacity(quotas.len());
        for q in &quotas {
            if !seen.insert(q.name.as_str()) {
                return Err(RateLimitError::validation(format!(
                    "duplicate quota name: {}",
                    q.name
                )));
            }
        }
        Ok(Self { quotas })
    }

    /// Iterate the quotas in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Quota> {
        self.quotas.iter()
    }

    /// Number of quotas.
    pub fn len(&self) -> usize {
        self.quotas.len()
    }

    /// Whether the set is empty (always false for a validly built set).
    pub fn is_empty(&self) -> bool {
        self.quotas.is_empty()
    }

    /// Look up a quota by name.
    pub fn get(&self, name: &str) -> Option<&Quota> {
        self.quotas.iter().find(|q| q.name == name)
    }

    /// The most restrictive (smallest) limit across all quotas, used to
    /// derive an automatic `max_retries`.
    pub fn min_limit(&self) -> u64 {
        self.quotas.iter().map(|q| q.limit).min().unwrap_or(1)
    }

    /// The largest window across all quotas, used for the TTL calculation.
    pub fn max_window(&self) -> Duration {
        self.quotas
            .iter()
            .map(|q| q.window)
            .max()
            .unwrap_or(MIN_WINDOW)
    }
}

/// Builder for a [`QuotaSet`].
#[derive(Debug, Default)]
pub struct QuotaSetBuilder {
    quotas: Vec<Quota>,
}

impl QuotaSetBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a quota dimension, validating it immediately.
    pub fn quota(mut self, name: impl Into<String>, limit: u64, window: Duration) -> Result<Self> {
        self.quotas.push(Quota::new(name, limit, window)?);
        Ok(self)
    }

    /// Finish building, validating set-level constraints.
    pub fn build(self) -> Result<QuotaSet> {
        QuotaSet::new(self.quotas)
    }
}

/// Burst/rate parameters shared by Token Bucket, Leaky Bucket, and GCRA.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketParams {
    burst: u64,
    rate: f64,
}

impl BucketParams {
    /// Create validated bucket parameters: `burst > 0`, `rate > 0`.
    pub fn new(burst: u64, rate: f64) -> Result<Self> {
        if burst == 0 {
            return Err(RateLimitError::validation("burst must be > 0"));
        }
        if !(rate > 0.0) || !rate.is_finite() {
            return Err(RateLimitError::validation("rate must be a finite value > 0"));
        }
        Ok(Self { burst, rate })
    }

    /// Maximum instantaneous capacity.
    pub fn burst(&self) -> u64 {
        self.burst
    }

    /// Continuous refill/drain/spacing rate, per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// `1 / rate`, the minimum spacing between conforming requests (GCRA).
    pub fn emission_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate)
    }
}
