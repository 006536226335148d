//! GCRA state codec: `41|tat`.

use crate::error::BackendError;

use super::{parse_timestamp, split_header, HEADER_GCRA};

/// GCRA state: a single theoretical-arrival-time timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GcraState {
    /// Unix-nanosecond theoretical arrival time of the next conforming request.
    pub tat_ns: i64,
}

impl GcraState {
    /// Encode to the wire format.
    pub fn encode(&self) -> String {
        format!("{HEADER_GCRA}|{}", self.tat_ns)
    }

    /// Decode from the wire format, rejecting any other header.
    pub fn decode(raw: &str) -> Result<Self, BackendError> {
        let payload = split_header(raw, HEADER_GCRA)?;
        let mut fields = payload.split('|');
        let tat_ns = parse_timestamp(
            fields
                .next()
                .ok_or_else(|| BackendError::Decoding("missing field: tat".into()))?,
        )?;
        if fields.next().is_some() {
            return Err(BackendError::Decoding("trailing fields in gcra state".into()));
        }
        Ok(Self { tat_ns })
    }
}
