//! # Repository Interfaces
//!
//! [`SealStore`] is the only shared mutable resource of the engine and its
//! serialization point. Every multi-row write is one atomic unit in the
//! store: either all rows change or none do.
//!
//! Claims follow a read-then-conditional-update pattern. A store never
//! overwrites a seal it did not find in the expected state; instead it
//! reports fewer claimed rows, which the engine treats as partial
//! fulfilment.
//!
//! [`PackageRegistry`] and [`SectorDirectory`] are read-only collaborators
//! owned by other parts of the system.

use std::collections::HashSet;

use async_trait::async_trait;

use lacre_core::{LotNumber, SealCode, SealId, SealPrefix, SealStatus, SectorId};

use crate::error::StoreError;
use crate::model::{
    BlockClaim, ConditionalUpdate, LotDestruction, LotSummary, PageRequest, Seal, SealChange,
    SealFilter, SealPage, SectorBlock,
};

/// Persistent table of seal records.
#[async_trait]
pub trait SealStore: Send + Sync {
    /// Insert one `available` seal per code, all in one atomic batch.
    /// Codes that already exist are skipped silently. Returns the number of
    /// rows actually inserted.
    async fn generate_range(
        &self,
        codes: &[SealCode],
        lot: Option<&LotNumber>,
    ) -> Result<u64, StoreError>;

    /// Filtered page, most recent first with ties broken by descending id.
    async fn list_seals(
        &self,
        filter: &SealFilter,
        page: &PageRequest,
    ) -> Result<SealPage, StoreError>;

    async fn get_seal(&self, id: SealId) -> Result<Option<Seal>, StoreError>;

    /// Ids of `available` seals in ascending order, at most `limit` of them.
    async fn available_ids(&self, limit: Option<u64>) -> Result<Vec<SealId>, StoreError>;

    /// Atomically claim up to `quantity` of the oldest `available` seals for
    /// `sector`, setting `status = assigned`. Returns the claimed ids in
    /// ascending order.
    async fn claim_oldest(
        &self,
        sector: SectorId,
        quantity: u64,
    ) -> Result<Vec<SealId>, StoreError>;

    /// Claim every block in one atomic batch. Within a block, only rows
    /// still `available` are claimed.
    async fn claim_blocks(&self, blocks: &[SectorBlock]) -> Result<Vec<BlockClaim>, StoreError>;

    /// Destroy a whole lot, or nothing. Counts blocking seals and updates
    /// every seal of the lot within one transaction.
    async fn destroy_lot(
        &self,
        lot: &LotNumber,
        reason: &str,
    ) -> Result<LotDestruction, StoreError>;

    /// Write `change` only if the seal still has `expected`'s status and
    /// `updated_at`.
    async fn update_seal(
        &self,
        expected: &Seal,
        change: &SealChange,
    ) -> Result<ConditionalUpdate, StoreError>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete_seal(&self, id: SealId) -> Result<bool, StoreError>;

    /// Every seal whose `sector_id` is `sector`, newest id first.
    async fn seals_held_by(&self, sector: SectorId) -> Result<Vec<Seal>, StoreError>;

    /// Per-lot counters, ordered by lot label. Seals without a lot are
    /// excluded.
    async fn lot_summaries(&self) -> Result<Vec<LotSummary>, StoreError>;

    /// Highest sequence number in use under `prefix`.
    async fn max_sequence(&self, prefix: &SealPrefix) -> Result<Option<u64>, StoreError>;

    /// Seal count for every status with at least one seal.
    async fn count_by_status(&self) -> Result<Vec<(SealStatus, u64)>, StoreError>;
}

/// Read-only view of package records that reference seals.
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// The subset of `seals` referenced by at least one package.
    async fn seals_with_packages(&self, seals: &[SealId]) -> Result<HashSet<SealId>, StoreError>;
}

/// Read-only view of the sector directory.
#[async_trait]
pub trait SectorDirectory: Send + Sync {
    /// The subset of `sectors` that do not exist, in input order.
    async fn unknown_sectors(&self, sectors: &[SectorId]) -> Result<Vec<SectorId>, StoreError>;
}
