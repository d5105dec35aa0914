//! # Seal Codes and Lot Labels
//!
//! A seal code is a prefix followed by a zero-padded sequence number:
//! `LACRE` + `000042` = `LACRE000042`. Numbers wider than six digits are
//! written in full; padding never truncates.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Minimum number of digits in the sequence part of a seal code.
pub const SEQUENCE_WIDTH: usize = 6;

const MAX_PREFIX_LEN: usize = 32;
const MAX_LOT_LEN: usize = 64;

/// Validated seal code prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SealPrefix(String);

impl SealPrefix {
    /// Validate a prefix. Surrounding whitespace is trimmed; inner whitespace
    /// is rejected because codes are scanned and typed by operators.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidPrefix(
                raw.to_string(),
                "must not be empty",
            ));
        }
        if trimmed.chars().count() > MAX_PREFIX_LEN {
            return Err(ValidationError::InvalidPrefix(
                raw.to_string(),
                "must not exceed 32 characters",
            ));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidPrefix(
                raw.to_string(),
                "must not contain whitespace",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SealPrefix {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<SealPrefix> for String {
    fn from(value: SealPrefix) -> Self {
        value.0
    }
}

impl std::fmt::Display for SealPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-readable seal code, unique across all seals.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealCode(String);

impl SealCode {
    /// Compose the code for sequence number `n` under `prefix`.
    pub fn compose(prefix: &SealPrefix, n: u64) -> Self {
        Self(format!("{}{:0width$}", prefix.as_str(), n, width = SEQUENCE_WIDTH))
    }

    /// Wrap a code read back from the store.
    pub fn from_stored(code: String) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Sequence number of this code under `prefix`, if the code starts with
    /// the prefix and the remainder is all ASCII digits.
    pub fn sequence_under(&self, prefix: &SealPrefix) -> Option<u64> {
        let rest = self.0.strip_prefix(prefix.as_str())?;
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        rest.parse().ok()
    }
}

impl std::fmt::Display for SealCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Administrative lot label assigned at generation time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LotNumber(String);

impl LotNumber {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidLot(
                raw.to_string(),
                "must not be empty",
            ));
        }
        if trimmed.chars().count() > MAX_LOT_LEN {
            return Err(ValidationError::InvalidLot(
                raw.to_string(),
                "must not exceed 64 characters",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Optional lot label: absent or blank input means "no lot".
    pub fn optional(raw: Option<&str>) -> Result<Option<Self>, ValidationError> {
        match raw {
            Some(s) if !s.trim().is_empty() => Self::new(s).map(Some),
            _ => Ok(None),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LotNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<LotNumber> for String {
    fn from(value: LotNumber) -> Self {
        value.0
    }
}

impl std::fmt::Display for LotNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
