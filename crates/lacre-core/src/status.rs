//! # Seal Status — Single Source of Truth
//!
//! The closed set of statuses a seal can carry. Every status that reaches a
//! store is written in the canonical `as_str()` form.
//!
//! ## Historical spellings
//!
//! Legacy data carries Portuguese labels in mixed case, with and without
//! accents, including the known typo `UTILILIZADO`. [`SealStatus::canonicalize`]
//! is the one place those variants are folded into the enumeration:
//!
//! | Canonical | Accepted variants |
//! |-----------|-------------------|
//! | `available` | `disponivel`, `disponível` |
//! | `assigned` | `atribuido`, `atribuído` |
//! | `reserved` | `reservado` |
//! | `linked` | `vinculado` |
//! | `used` | `utilizado`, `utililizado`, `usado` |
//! | `lost` | `extraviado` |
//! | `damaged` | `danificado` |
//! | `destroyed` | `destruido`, `destruído` |

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

/// Lifecycle status of a seal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SealStatus {
    /// Minted and not held by any sector.
    Available,
    /// Handed to a sector by distribution.
    Assigned,
    /// Held by a sector and set aside for a specific shipment.
    Reserved,
    /// Held by a sector and attached to a package not yet dispatched.
    Linked,
    /// Consumed against a package.
    Used,
    /// Reported lost (final).
    Lost,
    /// Reported damaged (final).
    Damaged,
    /// Destroyed with a recorded reason (final).
    Destroyed,
}

impl SealStatus {
    /// All statuses in lifecycle order.
    pub fn all() -> &'static [SealStatus] {
        &[
            Self::Available,
            Self::Assigned,
            Self::Reserved,
            Self::Linked,
            Self::Used,
            Self::Lost,
            Self::Damaged,
            Self::Destroyed,
        ]
    }

    /// Canonical storage and wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Assigned => "assigned",
            Self::Reserved => "reserved",
            Self::Linked => "linked",
            Self::Used => "used",
            Self::Lost => "lost",
            Self::Damaged => "damaged",
            Self::Destroyed => "destroyed",
        }
    }

    /// Whether a sector holds the seal without having consumed it.
    pub fn is_held(&self) -> bool {
        matches!(self, Self::Assigned | Self::Reserved | Self::Linked)
    }

    /// Negative end states: lost, damaged, destroyed.
    pub fn is_terminal_negative(&self) -> bool {
        matches!(self, Self::Lost | Self::Damaged | Self::Destroyed)
    }

    /// Fold any known spelling of a status into the enumeration.
    ///
    /// Matching ignores case, surrounding whitespace and Portuguese
    /// diacritics. Returns `None` for blank or unrecognised input.
    pub fn canonicalize(raw: &str) -> Option<SealStatus> {
        let folded = fold(raw);
        let status = match folded.as_str() {
            "available" | "disponivel" => Self::Available,
            "assigned" | "atribuido" => Self::Assigned,
            "reserved" | "reservado" => Self::Reserved,
            "linked" | "vinculado" => Self::Linked,
            "used" | "utilizado" | "utililizado" | "usado" => Self::Used,
            "lost" | "extraviado" => Self::Lost,
            "damaged" | "danificado" => Self::Damaged,
            "destroyed" | "destruido" => Self::Destroyed,
            _ => return None,
        };
        Some(status)
    }
}

/// Lower-case, trim and strip the accents that occur in Portuguese labels.
fn fold(raw: &str) -> String {
    raw.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

impl std::fmt::Display for SealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SealStatus {
    type Err = ValidationError;

    /// Lenient parse through [`SealStatus::canonicalize`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::canonicalize(s).ok_or_else(|| ValidationError::UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_statuses_unique() {
        let mut seen = std::collections::HashSet::new();
        for s in SealStatus::all() {
            assert!(seen.insert(s.as_str()), "duplicate status {s}");
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn canonical_forms_parse_to_themselves() {
        for status in SealStatus::all() {
            assert_eq!(SealStatus::canonicalize(status.as_str()), Some(*status));
            let parsed: SealStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, *status);
        }
    }

    #[test]
    fn legacy_spellings_fold() {
        assert_eq!(SealStatus::canonicalize("disponivel"), Some(SealStatus::Available));
        assert_eq!(SealStatus::canonicalize("Disponível"), Some(SealStatus::Available));
        assert_eq!(SealStatus::canonicalize(" ATRIBUÍDO "), Some(SealStatus::Assigned));
        assert_eq!(SealStatus::canonicalize("UTILIZADO"), Some(SealStatus::Used));
        assert_eq!(SealStatus::canonicalize("UTILILIZADO"), Some(SealStatus::Used));
        assert_eq!(SealStatus::canonicalize("usado"), Some(SealStatus::Used));
        assert_eq!(SealStatus::canonicalize("Extraviado"), Some(SealStatus::Lost));
        assert_eq!(SealStatus::canonicalize("danificado"), Some(SealStatus::Damaged));
        assert_eq!(SealStatus::canonicalize("DESTRUÍDO"), Some(SealStatus::Destroyed));
        assert_eq!(SealStatus::canonicalize("vinculado"), Some(SealStatus::Linked));
        assert_eq!(SealStatus::canonicalize("reservado"), Some(SealStatus::Reserved));
    }

    #[test]
    fn unknown_and_blank_rejected() {
        assert_eq!(SealStatus::canonicalize(""), None);
        assert_eq!(SealStatus::canonicalize("   "), None);
        assert_eq!(SealStatus::canonicalize("broken"), None);
        let err = "broken".parse::<SealStatus>().unwrap_err();
        assert_eq!(err, ValidationError::UnknownStatus("broken".to_string()));
    }

    #[test]
    fn held_and_terminal_sets() {
        let held: Vec<_> = SealStatus::all().iter().filter(|s| s.is_held()).collect();
        assert_eq!(
            held,
            vec![&SealStatus::Assigned, &SealStatus::Reserved, &SealStatus::Linked]
        );
        assert!(SealStatus::Destroyed.is_terminal_negative());
        assert!(SealStatus::Lost.is_terminal_negative());
        assert!(SealStatus::Damaged.is_terminal_negative());
        assert!(!SealStatus::Used.is_terminal_negative());
        assert!(!SealStatus::Available.is_held());
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&SealStatus::Destroyed).unwrap();
        assert_eq!(json, "\"destroyed\"");
        let parsed: SealStatus = serde_json::from_str("\"linked\"").unwrap();
        assert_eq!(parsed, SealStatus::Linked);
    }
}
