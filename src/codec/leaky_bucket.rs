//! Leaky Bucket state codec: `31|requests|last_leak`.

use crate::error::BackendError;

use super::{format_f64, parse_f64, parse_timestamp, split_header, HEADER_LEAKY_BUCKET};

/// Leaky Bucket state: `(requests, last_leak)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeakyBucketState {
    /// Currently queued requests, `0 <= requests <= burst`.
    pub requests: f64,
    /// Unix-nanosecond timestamp of the last observation.
    pub last_leak_ns: i64,
}

impl LeakyBucketState {
    /// Encode to the wire format.
    pub fn encode(&self) -> String {
        format!(
            "{HEADER_LEAKY_BUCKET}|{}|{}",
            format_f64(self.requests),
            self.last_leak_ns
        )
    }

    /// Decode from the wire format, rejecting any other header.
    pub fn decode(raw: &str) -> Result<Self, BackendError> {
        let payload = split_header(raw, HEADER_LEAKY_BUCKET)?;
        let mut fields = payload.split('|');
        let requests = parse_f64(fields.next().ok_or_else(|| missing("requests"))?)?;
        let last_leak_ns = parse_timestamp(fields.next().ok_or_else(|| missing("last_leak"))?)?;
        if fields.next().is_some() {
            return Err(BackendError::Decoding("trailing fields in leaky bucket state".into()));
        }
        Ok(Self {
            requests,
            last_leak_ns,
        })
    }
}

fn missing(field: &str) -> BackendError {
    BackendError::Decoding(format!("missing field: {field}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let state = LeakyBucketState {
            requests: 2.25,
            last_leak_ns: 42,
        };
        let encoded = state.encode();
        assert_eq!(LeakyBucketState::decode(&encoded).unwrap(), state);
    }

    #[test]
    fn test_decode_rejects_foreign_header() {
        assert!(LeakyBucketState::decode("11|1.0|1").is_err());
    }
}
