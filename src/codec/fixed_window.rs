//! Fixed Window multi-quota state codec:
//! `23|N|name1|count1|start1|...|nameN|countN|startN`, `N <= 8`.

use crate::error::BackendError;
use crate::quota::MAX_QUOTAS;

use super::{parse_timestamp, parse_u64, split_header, HEADER_FIXED_WINDOW};

/// One quota's counter state within a Fixed Window fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaCounter {
    /// Quota name, matching a configured [`crate::quota::Quota`].
    pub name: String,
    /// Requests counted in the current window.
    pub count: u64,
    /// Unix-nanosecond start of the current window.
    pub start_ns: i64,
}

/// Ordered list of per-quota counters sharing one fingerprint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixedWindowState {
    /// Counters, in the same order quotas were configured.
    pub counters: Vec<QuotaCounter>,
}

impl FixedWindowState {
    /// Encode to the wire format.
    pub fn encode(&self) -> String {
        let mut out = format!("{HEADER_FIXED_WINDOW}|{}", self.counters.len());
        for c in &self.counters {
            out.push('|');
            out.push_str(&c.name);
            out.push('|');
            out.push_str(&c.count.to_string());
            out.push('|');
            out.push_str(&c.start_ns.to_string());
        }
        out
    }

    /// Decode from the wire format, rejecting any other header or a count
    /// mismatch/overflow.
    pub fn decode(raw: &str) -> Result<Self, BackendError> {
        let payload = split_header(raw, HEADER_FIXED_WINDOW)?;
        let mut fields = payload.split('|');
        let n = parse_u64(
            fields
                .next()
                .ok_or_else(|| BackendError::Decoding("missing quota count".into()))?,
        )? as usize;
        if n > MAX_QUOTAS {
            return Err(BackendError::Decoding(format!(
                "quota count {n} exceeds maximum {MAX_QUOTAS}"
            )));
        }

        let mut counters = Vec::with_capacity(n);
        for _ in 0..n {
            let name = fields
                .next()
                .ok_or_else(|| BackendError::Decoding("missing quota name".into()))?
                .to_string();
            let count = parse_u64(
                fields
                    .next()
                    .ok_or_else(|| BackendError::Decoding("missing quota count field".into()))?,
            )?;
            let start_ns = parse_timestamp(
                fields
                    .next()
                    .ok_or_else(|| BackendError::Decoding("missing quota start field".into()))?,
            )?;
            counters.push(QuotaCounter {
                name,
                count,
                start_ns,
            });
        }

        if fields.next().is_some() {
            return Err(BackendError::Decoding(
                "trailing fields in fixed window state".into(),
            ));
        }

        Ok(Self { counters })
    }
}
