//! # Engine Data Model
//!
//! Records exchanged between [`SealEngine`](crate::SealEngine) and
//! [`SealStore`](crate::store::SealStore) implementations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lacre_core::{LotNumber, PackageId, SealCode, SealId, SealStatus, SectorId};

/// A seal as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seal {
    pub id: SealId,
    pub code: SealCode,
    pub status: SealStatus,
    pub lot_number: Option<LotNumber>,
    /// Sector currently holding the seal.
    pub sector_id: Option<SectorId>,
    /// Package the seal was consumed on.
    pub linked_package_id: Option<PackageId>,
    pub destruction_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Seal {
    /// Whether this seal blocks destruction of its lot: any status other
    /// than `available`, any holding sector, or any package link.
    pub fn blocks_lot_destruction(&self) -> bool {
        self.status != SealStatus::Available
            || self.sector_id.is_some()
            || self.linked_package_id.is_some()
    }
}

/// Fully resolved values for the mutable fields of one seal.
///
/// Built by the engine from the current record plus the requested patch, then
/// applied by the store only if the record is unchanged since it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealChange {
    pub status: SealStatus,
    pub sector_id: Option<SectorId>,
    pub linked_package_id: Option<PackageId>,
    pub destruction_reason: Option<String>,
}

impl SealChange {
    /// Start from the current values of `seal`.
    pub fn from_seal(seal: &Seal) -> Self {
        Self {
            status: seal.status,
            sector_id: seal.sector_id,
            linked_package_id: seal.linked_package_id,
            destruction_reason: seal.destruction_reason.clone(),
        }
    }
}

/// Outcome of a conditional single-seal write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalUpdate {
    /// Written; carries the new record.
    Applied(Seal),
    /// No seal with that id.
    Missing,
    /// The seal's status or `updated_at` no longer match what was read.
    Stale,
}

/// Contiguous run of seal ids destined for one sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorBlock {
    pub sector_id: SectorId,
    /// Ascending, contiguous slice of the ordered available ids.
    pub seal_ids: Vec<SealId>,
}

/// What a store actually claimed for one [`SectorBlock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockClaim {
    pub sector_id: SectorId,
    /// Number of ids in the planned block.
    pub planned: u64,
    /// Ids whose row still matched `status = available` and were claimed.
    pub claimed: Vec<SealId>,
}

/// Outcome of the store-side lot destruction transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotDestruction {
    /// Every seal in the lot was destroyed.
    Destroyed { rows: u64 },
    /// Nothing was changed; `held` seals block the lot.
    Blocked { held: u64 },
}

/// Per-lot counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotSummary {
    pub lot_number: LotNumber,
    pub total: u64,
    /// Seals that block destruction (see [`Seal::blocks_lot_destruction`]).
    pub held: u64,
    pub destroyed: u64,
}

impl LotSummary {
    /// A lot is destroyable when it has seals and none of them blocks
    /// destruction. Already destroyed seals block, so a lot is destroyed once.
    pub fn destroyable(&self) -> bool {
        self.total > 0 && self.held == 0
    }
}

/// Listing filter. All criteria are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SealFilter {
    /// Case-insensitive substring match on code or lot.
    pub search: Option<String>,
    pub status: Option<SealStatus>,
    pub sector_id: Option<SectorId>,
    pub lot_number: Option<LotNumber>,
}

impl SealFilter {
    /// Whether `seal` passes every criterion.
    pub fn matches(&self, seal: &Seal) -> bool {
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let in_code = seal.code.as_str().to_lowercase().contains(&term);
            let in_lot = seal
                .lot_number
                .as_ref()
                .is_some_and(|l| l.as_str().to_lowercase().contains(&term));
            if !in_code && !in_lot {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != seal.status) {
            return false;
        }
        if self.sector_id.is_some() && self.sector_id != seal.sector_id {
            return false;
        }
        if self.lot_number.is_some() && self.lot_number != seal.lot_number {
            return false;
        }
        true
    }
}

pub const DEFAULT_PAGE_LIMIT: u32 = 24;
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// One page of seals, most recent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealPage {
    pub seals: Vec<Seal>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl SealPage {
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seal(id: i64, code: &str, lot: Option<&str>) -> Seal {
        let now = Utc::now();
        Seal {
            id: SealId(id),
            code: SealCode::from_stored(code.to_string()),
            status: SealStatus::Available,
            lot_number: lot.map(|l| LotNumber::new(l).unwrap()),
            sector_id: None,
            linked_package_id: None,
            destruction_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn clean_available_seal_does_not_block() {
        assert!(!seal(1, "LACRE000001", Some("L1")).blocks_lot_destruction());
    }

    #[test]
    fn sector_status_or_package_blocks() {
        let mut s = seal(1, "LACRE000001", Some("L1"));
        s.sector_id = Some(SectorId(3));
        assert!(s.blocks_lot_destruction());

        let mut s = seal(1, "LACRE000001", Some("L1"));
        s.status = SealStatus::Reserved;
        assert!(s.blocks_lot_destruction());

        let mut s = seal(1, "LACRE000001", Some("L1"));
        s.linked_package_id = Some(PackageId(9));
        assert!(s.blocks_lot_destruction());
    }

    #[test]
    fn filter_search_is_case_insensitive_on_code_and_lot() {
        let s = seal(1, "LACRE000001", Some("Lote-Março"));
        let by_code = SealFilter {
            search: Some("lacre0000".to_string()),
            ..Default::default()
        };
        assert!(by_code.matches(&s));
        let by_lot = SealFilter {
            search: Some("lote-mar".to_string()),
            ..Default::default()
        };
        assert!(by_lot.matches(&s));
        let miss = SealFilter {
            search: Some("zzz".to_string()),
            ..Default::default()
        };
        assert!(!miss.matches(&s));
    }

    #[test]
    fn filter_exact_criteria() {
        let mut s = seal(1, "LACRE000001", Some("L1"));
        s.sector_id = Some(SectorId(4));
        s.status = SealStatus::Assigned;
        let f = SealFilter {
            status: Some(SealStatus::Assigned),
            sector_id: Some(SectorId(4)),
            lot_number: Some(LotNumber::new("L1").unwrap()),
            ..Default::default()
        };
        assert!(f.matches(&s));
        let wrong_sector = SealFilter {
            sector_id: Some(SectorId(5)),
            ..Default::default()
        };
        assert!(!wrong_sector.matches(&s));
    }

    #[test]
    fn page_offset_and_total_pages() {
        let p = PageRequest { page: 3, limit: 24 };
        assert_eq!(p.offset(), 48);
        let page = SealPage {
            seals: vec![],
            total: 49,
            page: 3,
            limit: 24,
        };
        assert_eq!(page.total_pages(), 3);
        let empty = SealPage {
            seals: vec![],
            total: 0,
            page: 1,
            limit: 24,
        };
        assert_eq!(empty.total_pages(), 0);
    }

    #[test]
    fn lot_summary_destroyable() {
        let lot = LotNumber::new("L1").unwrap();
        let clean = LotSummary {
            lot_number: lot.clone(),
            total: 5,
            held: 0,
            destroyed: 0,
        };
        assert!(clean.destroyable());
        let held = LotSummary {
            held: 1,
            ..clean.clone()
        };
        assert!(!held.destroyable());
    }
}
