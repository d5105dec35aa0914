//! In-memory implementations of [`SealStore`], [`PackageRegistry`] and
//! [`SectorDirectory`].
//!
//! Used for development without a database and as the fake backend in
//! engine tests. Each trait method takes the write lock once, so every
//! batch is atomic with respect to concurrent callers.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use lacre_core::{
    LotNumber, PackageId, SealCode, SealId, SealPrefix, SealStatus, SectorId,
};

use crate::error::StoreError;
use crate::model::{
    BlockClaim, ConditionalUpdate, LotDestruction, LotSummary, PageRequest, Seal, SealChange,
    SealFilter, SealPage, SectorBlock,
};
use crate::store::{PackageRegistry, SealStore, SectorDirectory};

#[derive(Default)]
struct Inner {
    seals: BTreeMap<SealId, Seal>,
    codes: HashSet<SealCode>,
    last_id: i64,
}

/// Seal table held in process memory. Data is lost on restart.
#[derive(Default)]
pub struct MemorySealStore {
    inner: RwLock<Inner>,
    offline: AtomicBool,
}

impl MemorySealStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Database`], as a
    /// lost connection would.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of seals currently stored.
    pub fn len(&self) -> usize {
        self.inner.read().seals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Database("store unavailable".to_string()));
        }
        Ok(())
    }
}

fn assign(seal: &mut Seal, sector: SectorId) {
    seal.status = SealStatus::Assigned;
    seal.sector_id = Some(sector);
    seal.updated_at = Utc::now();
}

#[async_trait]
impl SealStore for MemorySealStore {
    async fn generate_range(
        &self,
        codes: &[SealCode],
        lot: Option<&LotNumber>,
    ) -> Result<u64, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.write();
        let now = Utc::now();
        let mut inserted = 0;
        for code in codes {
            if !inner.codes.insert(code.clone()) {
                continue;
            }
            inner.last_id += 1;
            let id = SealId(inner.last_id);
            inner.seals.insert(
                id,
                Seal {
                    id,
                    code: code.clone(),
                    status: SealStatus::Available,
                    lot_number: lot.cloned(),
                    sector_id: None,
                    linked_package_id: None,
                    destruction_reason: None,
                    created_at: now,
                    updated_at: now,
                },
            );
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn list_seals(
        &self,
        filter: &SealFilter,
        page: &PageRequest,
    ) -> Result<SealPage, StoreError> {
        self.check_online()?;
        let inner = self.inner.read();
        let mut matching: Vec<&Seal> = inner.seals.values().filter(|s| filter.matches(s)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matching.len() as u64;
        let seals = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        Ok(SealPage {
            seals,
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn get_seal(&self, id: SealId) -> Result<Option<Seal>, StoreError> {
        self.check_online()?;
        Ok(self.inner.read().seals.get(&id).cloned())
    }

    async fn available_ids(&self, limit: Option<u64>) -> Result<Vec<SealId>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read();
        let ids = inner
            .seals
            .values()
            .filter(|s| s.status == SealStatus::Available)
            .map(|s| s.id);
        Ok(match limit {
            Some(n) => ids.take(n as usize).collect(),
            None => ids.collect(),
        })
    }

    async fn claim_oldest(
        &self,
        sector: SectorId,
        quantity: u64,
    ) -> Result<Vec<SealId>, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.write();
        let mut claimed = Vec::new();
        for seal in inner.seals.values_mut() {
            if claimed.len() as u64 >= quantity {
                break;
            }
            if seal.status == SealStatus::Available {
                assign(seal, sector);
                claimed.push(seal.id);
            }
        }
        Ok(claimed)
    }

    async fn claim_blocks(&self, blocks: &[SectorBlock]) -> Result<Vec<BlockClaim>, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.write();
        let mut claims = Vec::with_capacity(blocks.len());
        for block in blocks {
            let mut claimed = Vec::with_capacity(block.seal_ids.len());
            for id in &block.seal_ids {
                if let Some(seal) = inner.seals.get_mut(id) {
                    if seal.status == SealStatus::Available {
                        assign(seal, block.sector_id);
                        claimed.push(*id);
                    }
                }
            }
            claims.push(BlockClaim {
                sector_id: block.sector_id,
                planned: block.seal_ids.len() as u64,
                claimed,
            });
        }
        Ok(claims)
    }

    async fn destroy_lot(
        &self,
        lot: &LotNumber,
        reason: &str,
    ) -> Result<LotDestruction, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.write();
        let in_lot = |s: &Seal| s.lot_number.as_ref() == Some(lot);
        let held = inner
            .seals
            .values()
            .filter(|s| in_lot(s) && s.blocks_lot_destruction())
            .count() as u64;
        if held > 0 {
            return Ok(LotDestruction::Blocked { held });
        }
        let now = Utc::now();
        let mut rows = 0;
        for seal in inner.seals.values_mut().filter(|s| in_lot(s)) {
            seal.status = SealStatus::Destroyed;
            seal.destruction_reason = Some(reason.to_string());
            seal.updated_at = now;
            rows += 1;
        }
        Ok(LotDestruction::Destroyed { rows })
    }

    async fn update_seal(
        &self,
        expected: &Seal,
        change: &SealChange,
    ) -> Result<ConditionalUpdate, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.write();
        let Some(seal) = inner.seals.get_mut(&expected.id) else {
            return Ok(ConditionalUpdate::Missing);
        };
        if seal.status != expected.status || seal.updated_at != expected.updated_at {
            return Ok(ConditionalUpdate::Stale);
        }
        seal.status = change.status;
        seal.sector_id = change.sector_id;
        seal.linked_package_id = change.linked_package_id;
        seal.destruction_reason = change.destruction_reason.clone();
        seal.updated_at = Utc::now();
        Ok(ConditionalUpdate::Applied(seal.clone()))
    }

    async fn delete_seal(&self, id: SealId) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.write();
        match inner.seals.remove(&id) {
            Some(seal) => {
                inner.codes.remove(&seal.code);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn seals_held_by(&self, sector: SectorId) -> Result<Vec<Seal>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read();
        Ok(inner
            .seals
            .values()
            .rev()
            .filter(|s| s.sector_id == Some(sector))
            .cloned()
            .collect())
    }

    async fn lot_summaries(&self) -> Result<Vec<LotSummary>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read();
        let mut lots: BTreeMap<&LotNumber, LotSummary> = BTreeMap::new();
        for seal in inner.seals.values() {
            let Some(lot) = seal.lot_number.as_ref() else {
                continue;
            };
            let entry = lots.entry(lot).or_insert_with(|| LotSummary {
                lot_number: lot.clone(),
                total: 0,
                held: 0,
                destroyed: 0,
            });
            entry.total += 1;
            if seal.blocks_lot_destruction() {
                entry.held += 1;
            }
            if seal.status == SealStatus::Destroyed {
                entry.destroyed += 1;
            }
        }
        Ok(lots.into_values().collect())
    }

    async fn max_sequence(&self, prefix: &SealPrefix) -> Result<Option<u64>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read();
        Ok(inner
            .codes
            .iter()
            .filter_map(|c| c.sequence_under(prefix))
            .max())
    }

    async fn count_by_status(&self) -> Result<Vec<(SealStatus, u64)>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read();
        let mut counts: HashMap<SealStatus, u64> = HashMap::new();
        for seal in inner.seals.values() {
            *counts.entry(seal.status).or_default() += 1;
        }
        Ok(SealStatus::all()
            .iter()
            .filter_map(|s| counts.get(s).map(|n| (*s, *n)))
            .collect())
    }
}

/// Package backlinks held in memory: package id → seal id.
#[derive(Default)]
pub struct MemoryPackageRegistry {
    links: RwLock<HashMap<PackageId, SealId>>,
}

impl MemoryPackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `package` was sealed with `seal`.
    pub fn link(&self, package: PackageId, seal: SealId) {
        self.links.write().insert(package, seal);
    }

    pub fn unlink(&self, package: PackageId) {
        self.links.write().remove(&package);
    }
}

#[async_trait]
impl PackageRegistry for MemoryPackageRegistry {
    async fn seals_with_packages(&self, seals: &[SealId]) -> Result<HashSet<SealId>, StoreError> {
        let wanted: HashSet<&SealId> = seals.iter().collect();
        Ok(self
            .links
            .read()
            .values()
            .filter(|s| wanted.contains(s))
            .copied()
            .collect())
    }
}

/// Sector directory held in memory.
#[derive(Default)]
pub struct MemorySectorDirectory {
    sectors: RwLock<HashSet<SectorId>>,
}

impl MemorySectorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sectors(sectors: impl IntoIterator<Item = SectorId>) -> Self {
        Self {
            sectors: RwLock::new(sectors.into_iter().collect()),
        }
    }

    pub fn insert(&self, sector: SectorId) {
        self.sectors.write().insert(sector);
    }
}

#[async_trait]
impl SectorDirectory for MemorySectorDirectory {
    async fn unknown_sectors(&self, sectors: &[SectorId]) -> Result<Vec<SectorId>, StoreError> {
        let known = self.sectors.read();
        Ok(sectors.iter().filter(|s| !known.contains(*s)).copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(prefix: &str, range: std::ops::RangeInclusive<u64>) -> Vec<SealCode> {
        let p = SealPrefix::new(prefix).unwrap();
        range.map(|n| SealCode::compose(&p, n)).collect()
    }

    #[tokio::test]
    async fn generate_skips_existing_codes() {
        let store = MemorySealStore::new();
        assert_eq!(store.generate_range(&codes("L", 1..=5), None).await.unwrap(), 5);
        assert_eq!(store.generate_range(&codes("L", 3..=8), None).await.unwrap(), 3);
        assert_eq!(store.len(), 8);
    }

    #[tokio::test]
    async fn ids_increase_in_insertion_order() {
        let store = MemorySealStore::new();
        store.generate_range(&codes("L", 1..=3), None).await.unwrap();
        let ids = store.available_ids(None).await.unwrap();
        assert_eq!(ids, vec![SealId(1), SealId(2), SealId(3)]);
    }

    #[tokio::test]
    async fn claim_blocks_skips_rows_no_longer_available() {
        let store = MemorySealStore::new();
        store.generate_range(&codes("L", 1..=4), None).await.unwrap();
        store.claim_oldest(SectorId(1), 1).await.unwrap();
        let claims = store
            .claim_blocks(&[SectorBlock {
                sector_id: SectorId(2),
                seal_ids: vec![SealId(1), SealId(2)],
            }])
            .await
            .unwrap();
        assert_eq!(claims[0].planned, 2);
        assert_eq!(claims[0].claimed, vec![SealId(2)]);
        let first = store.get_seal(SealId(1)).await.unwrap().unwrap();
        assert_eq!(first.sector_id, Some(SectorId(1)));
    }

    #[tokio::test]
    async fn conditional_update_detects_stale_reads() {
        let store = MemorySealStore::new();
        store.generate_range(&codes("L", 1..=1), None).await.unwrap();
        let read = store.get_seal(SealId(1)).await.unwrap().unwrap();
        store.claim_oldest(SectorId(1), 1).await.unwrap();
        let change = SealChange {
            status: SealStatus::Lost,
            ..SealChange::from_seal(&read)
        };
        assert_eq!(
            store.update_seal(&read, &change).await.unwrap(),
            ConditionalUpdate::Stale
        );
    }

    #[tokio::test]
    async fn delete_frees_the_code() {
        let store = MemorySealStore::new();
        store.generate_range(&codes("L", 1..=1), None).await.unwrap();
        assert!(store.delete_seal(SealId(1)).await.unwrap());
        assert!(!store.delete_seal(SealId(1)).await.unwrap());
        assert_eq!(store.generate_range(&codes("L", 1..=1), None).await.unwrap(), 1);
        assert_eq!(store.available_ids(None).await.unwrap(), vec![SealId(2)]);
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemorySealStore::new();
        store.set_offline(true);
        let err = store.available_ids(None).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
        store.set_offline(false);
        assert!(store.available_ids(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn package_registry_filters_requested_ids() {
        let registry = MemoryPackageRegistry::new();
        registry.link(PackageId(100), SealId(2));
        registry.link(PackageId(101), SealId(9));
        let linked = registry
            .seals_with_packages(&[SealId(1), SealId(2)])
            .await
            .unwrap();
        assert_eq!(linked, HashSet::from([SealId(2)]));
        registry.unlink(PackageId(100));
        assert!(registry
            .seals_with_packages(&[SealId(2)])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn sector_directory_reports_unknown_in_order() {
        let dir = MemorySectorDirectory::with_sectors([SectorId(1), SectorId(3)]);
        let unknown = dir
            .unknown_sectors(&[SectorId(4), SectorId(1), SectorId(2)])
            .await
            .unwrap();
        assert_eq!(unknown, vec![SectorId(4), SectorId(2)]);
    }
}
