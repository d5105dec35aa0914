//! # Resolved Availability
//!
//! The display-time availability of a seal held by a sector, derived from
//! two sources that are not written in the same transaction:
//!
//! 1. the seal's own stored status, and
//! 2. whether any package record points back at the seal.
//!
//! Precedence, first match wins:
//!
//! 1. stored status is `used`, `reserved`, `linked`, `lost`, `damaged` or
//!    `destroyed` → [`Availability::Unavailable`];
//! 2. a package references the seal → [`Availability::Unavailable`], even
//!    when the stored status still says `available` or `assigned`;
//! 3. otherwise → [`Availability::Available`].
//!
//! The package check is an audit fallback. Consumption writes the seal
//! status synchronously, so rule 2 only fires for records written outside
//! the consumption path.

use serde::{Deserialize, Serialize};

use lacre_core::SealStatus;

/// Resolved availability of a seal for use by its holding sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unavailable,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
        }
    }

    /// Operator-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Unavailable => "Used / Unavailable",
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve availability from a canonical status and the package backlink.
pub fn resolve_availability(status: SealStatus, has_package_link: bool) -> Availability {
    let blocked_by_status = matches!(
        status,
        SealStatus::Used
            | SealStatus::Reserved
            | SealStatus::Linked
            | SealStatus::Lost
            | SealStatus::Damaged
            | SealStatus::Destroyed
    );
    if blocked_by_status || has_package_link {
        Availability::Unavailable
    } else {
        Availability::Available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SealStatus::*;

    #[test]
    fn consumed_and_negative_statuses_unavailable_regardless_of_link() {
        for status in [Used, Reserved, Linked, Lost, Damaged, Destroyed] {
            assert_eq!(resolve_availability(status, false), Availability::Unavailable);
            assert_eq!(resolve_availability(status, true), Availability::Unavailable);
        }
    }

    #[test]
    fn package_backlink_overrides_available_status() {
        assert_eq!(resolve_availability(Available, true), Availability::Unavailable);
        assert_eq!(resolve_availability(Assigned, true), Availability::Unavailable);
    }

    #[test]
    fn clean_assigned_seal_is_available_to_its_sector() {
        assert_eq!(resolve_availability(Assigned, false), Availability::Available);
        assert_eq!(resolve_availability(Available, false), Availability::Available);
    }

    #[test]
    fn labels() {
        assert_eq!(Availability::Available.label(), "Available");
        assert_eq!(Availability::Unavailable.label(), "Used / Unavailable");
        assert_eq!(
            serde_json::to_string(&Availability::Unavailable).unwrap(),
            "\"unavailable\""
        );
    }
}
