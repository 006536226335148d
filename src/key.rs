//! Fingerprint key assembly and validation.
//!
//! A fingerprint is the fully-qualified string handed to the backend. It is
//! assembled from a base key and a dynamic key, with an optional `:p`/`:s`
//! suffix added by the dual-strategy orchestrator.

use crate::error::{RateLimitError, Result};

/// Maximum length of a fingerprint component, in bytes.
pub const MAX_KEY_LEN: usize = 64;

const ALLOWED_EXTRA: &[u8] = b"_-:.@+";

/// Role suffix appended to a fingerprint in dual-strategy mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// No suffix (single-strategy mode).
    None,
    /// `:p` suffix, the primary sub-state.
    Primary,
    /// `:s` suffix, the secondary sub-state.
    Secondary,
}

impl Role {
    fn suffix(self) -> &'static str {
        match self {
            Role::None => "",
            Role::Primary => ":p",
            Role::Secondary => ":s",
        }
    }
}

/// Check that `s` satisfies the fingerprint charset/length rule:
/// UTF-8 ASCII, length 1..=64, charset `[A-Za-z0-9_\-:.@+]`.
pub fn validate_component(s: &str) -> Result<()> {
    if s.is_empty() || s.len() > MAX_KEY_LEN {
        return Err(RateLimitError::validation(format!(
            "key component length must be 1..={MAX_KEY_LEN}, got {}",
            s.len()
        )));
    }
    if !s.is_ascii() {
        return Err(RateLimitError::validation("key component must be ASCII"));
    }
    for b in s.bytes() {
        if !(b.is_ascii_alphanumeric() || ALLOWED_EXTRA.contains(&b)) {
            return Err(RateLimitError::validation(format!(
                "key component contains disallowed byte: {:?}",
                b as char
            )));
        }
    }
    Ok(())
}

/// Assemble and validate a fingerprint from a base key and a dynamic key.
///
/// The base key is always validated. The dynamic key is validated unless
/// `skip_dynamic_validation` is set, in which case it is still length-checked
/// implicitly by the final length check below (the combined fingerprint must
/// still fit the backend's key space, but no charset check is performed).
pub fn build_fingerprint(
    base_key: &str,
    dynamic_key: &str,
    skip_dynamic_validation: bool,
    role: Role,
) -> Result<String> {
    validate_component(base_key)?;
    if !skip_dynamic_validation {
        validate_component(dynamic_key)?;
    } else if dynamic_key.is_empty() {
        return Err(RateLimitError::validation("dynamic key must not be empty"));
    }

    let mut fp = String::with_capacity(base_key.len() + 1 + dynamic_key.len() + 2);
    fp.push_str(base_key);
    fp.push(':');
    fp.push_str(dynamic_key);
    fp.push_str(role.suffix());
    Ok(fp)
}
