//! Compact ASCII state codecs, one per algorithm, sharing a common header
//! format: two hex-ish digits `SV` (`S` = algorithm id, `V` = format version)
//! followed by `|`-delimited fields. Decoding a foreign or truncated header
//! is always a [`BackendError::Decoding`](crate::error::BackendError::Decoding)
//! error, never treated as contention.

mod composite;
mod fixed_window;
mod gcra;
mod leaky_bucket;
mod token_bucket;

pub use composite::CompositeState;
pub use fixed_window::FixedWindowState;
pub use gcra::GcraState;
pub use leaky_bucket::LeakyBucketState;
pub use token_bucket::TokenBucketState;

use crate::error::BackendError;

/// Header for the Token Bucket codec (`S=1, V=1`).
pub const HEADER_TOKEN_BUCKET: &str = "11";
/// Header for the Fixed Window codec (`S=2, V=3`).
pub const HEADER_FIXED_WINDOW: &str = "23";
/// Header for the Leaky Bucket codec (`S=3, V=1`).
pub const HEADER_LEAKY_BUCKET: &str = "31";
/// Header for the GCRA codec (`S=4, V=1`).
pub const HEADER_GCRA: &str = "41";
/// Header for the composite (dual-strategy) codec (`S=5, V=1`).
pub const HEADER_COMPOSITE: &str = "51";

/// Split off and validate the leading `SV|` header, returning the remainder.
pub(crate) fn split_header<'a>(raw: &'a str, expected: &str) -> Result<&'a str, BackendError> {
    let mut parts = raw.splitn(2, '|');
    let header = parts
        .next()
        .ok_or_else(|| BackendError::Decoding("empty record".into()))?;
    if header != expected {
        return Err(BackendError::Decoding(format!(
            "unexpected header {header:?}, wanted {expected:?}"
        )));
    }
    parts
        .next()
        .ok_or_else(|| BackendError::Decoding("record has no payload after header".into()))
}

/// Parse a `i64` nanosecond timestamp field.
pub(crate) fn parse_timestamp(field: &str) -> Result<i64, BackendError> {
    field
        .parse::<i64>()
        .map_err(|e| BackendError::Decoding(format!("bad timestamp {field:?}: {e}")))
}

/// Parse an `f64` field encoded with shortest round-trip decimal.
pub(crate) fn parse_f64(field: &str) -> Result<f64, BackendError> {
    field
        .parse::<f64>()
        .map_err(|e| BackendError::Decoding(format!("bad float {field:?}: {e}")))
}

/// Parse a `u64` field.
pub(crate) fn parse_u64(field: &str) -> Result<u64, BackendError> {
    field
        .parse::<u64>()
        .map_err(|e| BackendError::Decoding(format!("bad integer {field:?}: {e}")))
}

/// Format an `f64` with the shortest representation that round-trips.
pub(crate) fn format_f64(v: f64) -> String {
    let mut buf = ryu_like_format(v);
    if !buf.contains('.') && !buf.contains('e') && !buf.contains("inf") && !buf.contains("NaN") {
        buf.push_str(".0");
    }
    buf
}

/// Rust's default `{}` formatting for `f64` already produces the shortest
/// string that round-trips via `f64::from_str` (this has been guaranteed by
/// the standard library's Grisu/Ryu-derived formatter since 1.0 stabilized
/// the `Display` impl). Named separately so the "shortest round-trip" intent
/// from the spec is visible at the call site.
fn ryu_like_format(v: f64) -> String {
    format!("{v}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_header_ok() {
        assert_eq!(split_header("11|1.5|100", HEADER_TOKEN_BUCKET).unwrap(), "1.5|100");
    }

    #[test]
    fn test_split_header_rejects_foreign_header() {
        assert!(split_header("41|100", HEADER_TOKEN_BUCKET).is_err());
    }

    #[test]
    fn test_split_header_rejects_truncated() {
        assert!(split_header("11", HEADER_TOKEN_BUCKET).is_err());
        assert!(split_header("", HEADER_TOKEN_BUCKET).is_err());
    }

    #[test]
    fn test_format_f64_round_trips() {
        for v in [0.0, 1.0, 0.5, 123.456, 1e10, 1e-10] {
            let s = format_f64(v);
            let parsed: f64 = s.parse().unwrap();
            assert_eq!(parsed, v);
        }
    }
}
