//! Read-only views of the sector directory and the package registry.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;

use lacre_core::{SealId, SectorId};
use lacre_engine::{PackageRegistry, SectorDirectory, StoreError};

use super::store_err;

/// Package backlinks from `packages.seal_id`.
#[derive(Clone)]
pub struct PgPackageRegistry {
    pool: PgPool,
}

impl PgPackageRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PackageRegistry for PgPackageRegistry {
    async fn seals_with_packages(&self, seals: &[SealId]) -> Result<HashSet<SealId>, StoreError> {
        if seals.is_empty() {
            return Ok(HashSet::new());
        }
        let ids: Vec<i64> = seals.iter().map(SealId::get).collect();
        let linked: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT seal_id FROM packages WHERE seal_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(linked.into_iter().map(SealId).collect())
    }
}

/// Sector ids from `sectors.id`.
#[derive(Clone)]
pub struct PgSectorDirectory {
    pool: PgPool,
}

impl PgSectorDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SectorDirectory for PgSectorDirectory {
    async fn unknown_sectors(&self, sectors: &[SectorId]) -> Result<Vec<SectorId>, StoreError> {
        if sectors.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = sectors.iter().map(SectorId::get).collect();
        let known: HashSet<i64> =
            sqlx::query_scalar::<_, i64>("SELECT id FROM sectors WHERE id = ANY($1)")
                .bind(&ids)
                .fetch_all(&self.pool)
                .await
                .map_err(store_err)?
                .into_iter()
                .collect();
        Ok(missing_in_order(sectors, &known))
    }
}

fn missing_in_order(requested: &[SectorId], known: &HashSet<i64>) -> Vec<SectorId> {
    requested
        .iter()
        .filter(|s| !known.contains(&s.get()))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sectors_keep_request_order() {
        let known: HashSet<i64> = [7, 11].into_iter().collect();
        let requested = [SectorId(12), SectorId(7), SectorId(3), SectorId(11)];
        assert_eq!(
            missing_in_order(&requested, &known),
            vec![SectorId(12), SectorId(3)]
        );
    }
}
