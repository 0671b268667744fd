//! Public movie identifiers.
//!
//! Movies are exposed to callers (and to the metadata service) by their IMDb
//! id. Every identifier that enters the system goes through
//! [`ImdbId::parse`], so two spellings of the same movie ("TT114709",
//! "tt0114709 ") always end up as the same value.

use crate::error::{DataLoadError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Required literal prefix
pub const IMDB_PREFIX: &str = "tt";

/// Width of the zero-padded numeric suffix in canonical form
pub const CANONICAL_DIGITS: usize = 7;

/// Suffixes shorter than this are rejected rather than padded
const MIN_DIGITS: usize = 5;

/// Largest number of significant digits an id may carry
const MAX_SIGNIFICANT_DIGITS: usize = 8;

/// A normalized public movie identifier, e.g. `tt0114709`.
///
/// The inner string is always in canonical form: lowercase prefix followed by
/// at least [`CANONICAL_DIGITS`] digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImdbId(String);

impl ImdbId {
    /// Normalize a raw identifier.
    ///
    /// Trims and lowercases the input, requires the `tt` prefix and a numeric
    /// suffix, pads short suffixes to the canonical width and drops surplus
    /// leading zeros.
    pub fn parse(raw: &str) -> Result<Self> {
        let malformed = |reason| DataLoadError::MalformedIdentifier {
            raw: raw.to_string(),
            reason,
        };

        let lowered = raw.trim().to_ascii_lowercase();
        let digits = lowered
            .strip_prefix(IMDB_PREFIX)
            .ok_or_else(|| malformed("missing tt prefix"))?;

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed("non-numeric suffix"));
        }
        if digits.len() < MIN_DIGITS {
            return Err(malformed("suffix too short"));
        }

        let significant = digits.trim_start_matches('0');
        if significant.is_empty() {
            return Err(malformed("zero id"));
        }
        if significant.len() > MAX_SIGNIFICANT_DIGITS {
            return Err(malformed("suffix too long"));
        }

        Ok(Self(format!(
            "{IMDB_PREFIX}{significant:0>width$}",
            width = CANONICAL_DIGITS
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImdbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ImdbId {
    type Err = DataLoadError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ImdbId {
    type Error = DataLoadError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ImdbId> for String {
    fn from(id: ImdbId) -> Self {
        id.0
    }
}

impl AsRef<str> for ImdbId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_form_is_kept() {
        let id = ImdbId::parse("tt0114709").unwrap();
        assert_eq!(id.as_str(), "tt0114709");
    }

    #[test]
    fn test_case_and_whitespace_are_normalized() {
        let id = ImdbId::parse("  TT0114709\n").unwrap();
        assert_eq!(id.as_str(), "tt0114709");
    }

    #[test]
    fn test_short_suffix_is_padded() {
        // MovieLens links sometimes lose leading zeros
        let id = ImdbId::parse("tt114709").unwrap();
        assert_eq!(id.as_str(), "tt0114709");
    }

    #[test]
    fn test_surplus_zeros_are_truncated() {
        let id = ImdbId::parse("tt000114709").unwrap();
        assert_eq!(id.as_str(), "tt0114709");
    }

    #[test]
    fn test_eight_digit_ids_are_accepted() {
        let id = ImdbId::parse("tt10872600").unwrap();
        assert_eq!(id.as_str(), "tt10872600");
    }

    #[test]
    fn test_too_short_is_rejected() {
        let err = ImdbId::parse("tt1").unwrap_err();
        assert!(matches!(err, DataLoadError::MalformedIdentifier { .. }));
    }

    #[test]
    fn test_wrong_prefix_is_rejected() {
        assert!(ImdbId::parse("nm0000123").is_err());
        assert!(ImdbId::parse("0114709").is_err());
    }

    #[test]
    fn test_non_numeric_suffix_is_rejected() {
        assert!(ImdbId::parse("tt01147a9").is_err());
        assert!(ImdbId::parse("tt").is_err());
    }

    #[test]
    fn test_too_many_significant_digits_is_rejected() {
        assert!(ImdbId::parse("tt123456789").is_err());
    }

    #[test]
    fn test_serde_normalizes_on_read() {
        let id: ImdbId = serde_json::from_str("\"TT114709\"").unwrap();
        assert_eq!(id.as_str(), "tt0114709");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"tt0114709\"");
    }
}
