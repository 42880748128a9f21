//! Stable identity for action items.
//!
//! A fingerprint is the first eight hex characters of the MD5 digest of the
//! normalized description. Normalization is case folding plus trimming, so
//! the same task extracted on different days with different capitalization
//! or stray whitespace keeps one identity. The digest matches what earlier
//! deployments wrote to the `Item ID` column, which keeps existing stores
//! deduplicating across upgrades.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const FINGERPRINT_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of a description as produced by extraction.
    pub fn of(description: &str) -> Self {
        let digest = md5::compute(normalize(description).as_bytes());
        let mut hex = format!("{:x}", digest);
        hex.truncate(FINGERPRINT_LEN);
        Self(hex)
    }

    /// Wraps a fingerprint read back from the store.
    ///
    /// Returns `None` for empty values so records without an id never
    /// occupy a slot in the known set.
    pub fn from_stored(raw: &str) -> Option<Self> {
        let value = raw.trim().to_lowercase();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn normalize(description: &str) -> String {
    description.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest_prefix() {
        assert_eq!(Fingerprint::of("send proposal to client").as_str(), "72a0080a");
        assert_eq!(Fingerprint::of("book flight for offsite").as_str(), "7a109068");
    }

    #[test]
    fn test_normalization_before_hashing() {
        let canonical = Fingerprint::of("send proposal to client");
        assert_eq!(Fingerprint::of("  Send Proposal to CLIENT\n"), canonical);
        assert_eq!(
            Fingerprint::of(&normalize("\tSEND proposal to client ")),
            canonical
        );
    }

    #[test]
    fn test_deterministic_across_calls() {
        let first = Fingerprint::of("Review Q3 budget with finance");
        let second = Fingerprint::of("Review Q3 budget with finance");
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), FINGERPRINT_LEN);
        assert!(first.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_inner_whitespace_is_significant() {
        assert_ne!(
            Fingerprint::of("send proposal"),
            Fingerprint::of("send  proposal")
        );
    }

    #[test]
    fn test_from_stored() {
        assert_eq!(
            Fingerprint::from_stored(" 72A0080A "),
            Some(Fingerprint::of("Send proposal to client"))
        );
        assert_eq!(Fingerprint::from_stored("   "), None);
        assert_eq!(Fingerprint::from_stored(""), None);
    }
}
