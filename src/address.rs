//! Address validation and canonicalization.
//!
//! Every address that enters the screening engine goes through [`Address::parse`]:
//! a `0x` prefix followed by exactly 40 hex digits, stored lowercase.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address pattern is valid"));

pub const EXPECTED_FORMAT: &str = "must start with 0x and be exactly 42 characters";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid address '{input}': {expected}")]
pub struct ValidationError {
    pub input: String,
    pub expected: &'static str,
}

/// Canonical (lowercase) chain address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if !ADDRESS_RE.is_match(trimmed) {
            return Err(ValidationError {
                input: raw.to_string(),
                expected: EXPECTED_FORMAT,
            });
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lowercases() {
        let address = Address::parse("0xABCDEFabcdef1234567890123456789012345678").unwrap();
        assert_eq!(address.as_str(), "0xabcdefabcdef1234567890123456789012345678");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let address = Address::parse("  0x1234567890123456789012345678901234567890\n").unwrap();
        assert_eq!(address.as_str(), "0x1234567890123456789012345678901234567890");
    }

    #[test]
    fn test_rejects_bad_length() {
        let err = Address::parse("0x1234").unwrap_err();
        assert_eq!(err.input, "0x1234");
        assert!(err.to_string().contains("42 characters"));
    }

    #[test]
    fn test_rejects_missing_prefix_and_non_hex() {
        assert!(Address::parse("1234567890123456789012345678901234567890ab").is_err());
        assert!(Address::parse("0xZZ34567890123456789012345678901234567890").is_err());
        assert!(Address::parse("").is_err());
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let ok: Address =
            serde_json::from_str(r#""0x1234567890123456789012345678901234567890""#).unwrap();
        assert_eq!(ok.to_string(), "0x1234567890123456789012345678901234567890");
        assert!(serde_json::from_str::<Address>(r#""not-an-address""#).is_err());
    }
}
