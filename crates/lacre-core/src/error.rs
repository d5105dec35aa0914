//! # Validation Errors
//!
//! Errors raised by the validated constructors in this crate. All of them
//! are client-input errors: they are detected before any store access.

use thiserror::Error;

/// Input rejected by a validated constructor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Seal code prefix is empty, too long, or contains whitespace.
    #[error("invalid seal prefix {0:?}: {1}")]
    InvalidPrefix(String, &'static str),

    /// Lot label is empty or too long.
    #[error("invalid lot number {0:?}: {1}")]
    InvalidLot(String, &'static str),

    /// Status string does not name any known seal status.
    #[error("unknown seal status: {0:?}")]
    UnknownStatus(String),

    /// Identifier is not a positive integer.
    #[error("invalid {kind} identifier: {value}")]
    InvalidIdentifier {
        /// Identifier namespace ("seal", "sector", "package").
        kind: &'static str,
        /// Rejected value.
        value: i64,
    },
}
