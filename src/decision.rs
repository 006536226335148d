//! Per-quota results and the sink that collects them across a rate limit
//! check.
//!
//! A single `Allow`/`Peek` call may touch more than one quota at once —
//! every quota in a Fixed Window set, or both halves of a dual-strategy
//! check — so results are collected into a [`ResultSink`] keyed by quota
//! name rather than returned as a single value.

use std::time::SystemTime;

/// The default quota name used by single-quota algorithms (Token Bucket,
/// Leaky Bucket, GCRA), which don't otherwise need a name.
pub const DEFAULT_QUOTA_NAME: &str = "default";

/// Prefix applied to a dual-strategy primary's quota names in the sink.
pub const PRIMARY_PREFIX: &str = "primary_";
/// Prefix applied to a dual-strategy secondary's quota names in the sink.
pub const SECONDARY_PREFIX: &str = "secondary_";

/// One quota's outcome: whether it allowed the request, how much
/// headroom remains, and when it resets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaResult {
    /// Whether this quota alone allowed the request.
    pub allowed: bool,
    /// Requests still available before this quota denies.
    pub remaining: u64,
    /// When this quota's window/bucket returns to full capacity.
    pub reset: SystemTime,
}

impl QuotaResult {
    /// Construct a result.
    pub fn new(allowed: bool, remaining: u64, reset: SystemTime) -> Self {
        Self {
            allowed,
            remaining,
            reset,
        }
    }
}

/// An ordered collection of named quota results.
///
/// Preserves insertion order (matching the quota set's configured order)
/// rather than sorting by name.
#[derive(Debug, Clone, Default)]
pub struct ResultSink {
    entries: Vec<(String, QuotaResult)>,
}

impl ResultSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a quota's result under `name`, overwriting any prior entry
    /// with the same name.
    pub fn insert(&mut self, name: impl Into<String>, result: QuotaResult) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = result;
        } else {
            self.entries.push((name, result));
        }
    }

    /// Look up a quota's result by exact name.
    pub fn get(&self, name: &str) -> Option<&QuotaResult> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    /// The single-quota algorithms' only result.
    pub fn default_quota(&self) -> Option<&QuotaResult> {
        self.get(DEFAULT_QUOTA_NAME)
    }

    /// Whether every quota in the sink allowed the request.
    pub fn all_allowed(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|(_, r)| r.allowed)
    }

    /// Whether at least one quota in the sink allowed the request.
    pub fn any_allowed(&self) -> bool {
        self.entries.iter().any(|(_, r)| r.allowed)
    }

    /// Number of quotas recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no quotas have been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, result)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QuotaResult)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }
}

/// The overall result of an `Allow`/`Peek` call: whether the request was
/// let through, and the per-quota detail behind that decision.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Whether the request was allowed overall.
    pub allowed: bool,
    /// Per-quota detail.
    pub results: ResultSink,
}

impl Outcome {
    /// Construct an outcome from its overall verdict and per-quota detail.
    pub fn new(allowed: bool, results: ResultSink) -> Self {
        Self { allowed, results }
    }
}
