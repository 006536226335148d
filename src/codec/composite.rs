//! Composite (dual-strategy) state codec: `51|<primary_payload>$<secondary_payload>`.
//!
//! The composite codec treats the two sub-payloads as opaque, since it does
//! not know which algorithm produced them — that's the dual-strategy
//! orchestrator's job. The `$` separator is safe because every sub-codec
//! only ever emits digits, ASCII letters, `.`, `-`, `+`, and `|`.

use crate::error::BackendError;

use super::{split_header, HEADER_COMPOSITE};

/// Side-by-side encoding of a primary and secondary sub-state under one key.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeState {
    /// The primary strategy's fully encoded sub-payload (including its own header).
    pub primary: String,
    /// The secondary strategy's fully encoded sub-payload (including its own header).
    pub secondary: String,
}

impl CompositeState {
    /// Encode to the wire format.
    pub fn encode(&self) -> String {
        debug_assert!(!self.primary.contains('$'), "sub-payload must not contain '$'");
        debug_assert!(!self.secondary.contains('$'), "sub-payload must not contain '$'");
        format!("{HEADER_COMPOSITE}|{}${}", self.primary, self.secondary)
    }

    /// Decode from the wire format, rejecting any other header or a missing separator.
    pub fn decode(raw: &str) -> Result<Self, BackendError> {
        let payload = split_header(raw, HEADER_COMPOSITE)?;
        let mut parts = payload.splitn(2, '$');
        let primary = parts
            .next()
            .ok_or_else(|| BackendError::Decoding("missing primary sub-payload".into()))?
            .to_string();
        let secondary = parts
            .next()
            .ok_or_else(|| BackendError::Decoding("missing secondary sub-payload, no '$'".into()))?
            .to_string();
        Ok(Self { primary, secondary })
    }
}
