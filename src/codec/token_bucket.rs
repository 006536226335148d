//! Token Bucket state codec: `11|tokens|last_refill`.

use crate::error::BackendError;

use super::{format_f64, parse_f64, parse_timestamp, split_header, HEADER_TOKEN_BUCKET};

/// Token Bucket state: `(tokens, last_refill)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenBucketState {
    /// Currently available tokens, `0 <= tokens <= burst`.
    pub tokens: f64,
    /// Unix-nanosecond timestamp of the last observation.
    pub last_refill_ns: i64,
}

impl TokenBucketState {
    /// Encode to the wire format.
    pub fn encode(&self) -> String {
        format!(
            "{HEADER_TOKEN_BUCKET}|{}|{}",
            format_f64(self.tokens),
            self.last_refill_ns
        )
    }

    /// Decode from the wire format, rejecting any other header.
    pub fn decode(raw: &str) -> Result<Self, BackendError> {
        let payload = split_header(raw, HEADER_TOKEN_BUCKET)?;
        let mut fields = payload.split('|');
        let tokens = parse_f64(fields.next().ok_or_else(|| missing("tokens"))?)?;
        let last_refill_ns = parse_timestamp(fields.next().ok_or_else(|| missing("last_refill"))?)?;
        if fields.next().is_some() {
            return Err(BackendError::Decoding("trailing fields in token bucket state".into()));
        }
        Ok(Self {
            tokens,
            last_refill_ns,
        })
    }
}

fn missing(field: &str) -> BackendError {
    BackendError::Decoding(format!("missing field: {field}"))
}
