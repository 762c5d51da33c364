//! Fingerprint: a BLAKE3 digest of serialized profile bytes, truncated to 128 bits.
//!
//! The guard only needs to know whether the bytes it is about to write differ
//! from the bytes it last wrote, so 16 bytes of BLAKE3 is plenty.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A content fingerprint - 128 bits (16 bytes, 32 hex chars) of BLAKE3.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a byte sequence.
    pub fn of(data: &[u8]) -> Self {
        let digest = blake3::hash(data);
        Self(hex::encode(&digest.as_bytes()[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of_produces_32_hex_chars() {
        let fp = Fingerprint::of(br#"{"info":{"id":"abc"}}"#);
        assert_eq!(fp.as_str().len(), 32);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_same_bytes_same_fingerprint() {
        assert_eq!(Fingerprint::of(b"profile"), Fingerprint::of(b"profile"));
    }

    #[test]
    fn test_distinct_bytes_distinct_fingerprints() {
        // A single whitespace difference must register as a change.
        let compact = Fingerprint::of(br#"{"a":1}"#);
        let spaced = Fingerprint::of(br#"{"a": 1}"#);
        assert_ne!(compact, spaced);
    }

    #[test]
    fn test_matches_truncated_blake3() {
        let fp = Fingerprint::of(b"Concurrent Data");
        assert_eq!(fp.as_str(), "5c735d76fe3537a0f35cf4a4eb14a532");
        assert_eq!(fp.short(), "5c735d76");
    }
}
