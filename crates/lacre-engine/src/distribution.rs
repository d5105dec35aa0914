//! # Distribution Engine
//!
//! Hands `available` seals to sectors. Two strategies:
//!
//! - **Manual**: a fixed quantity of the oldest seals to one sector.
//! - **Automatic**: the available pool, optionally capped, split across an
//!   ordered sector list in contiguous ascending-id blocks. With `t` seals
//!   and `n` sectors each sector gets `floor(t/n)` seals and the first
//!   `t mod n` sectors get one more.
//!
//! Both strategies claim through the store, which only flips rows still
//! `available`. Receiving fewer seals than planned is partial fulfilment,
//! not an error.

use std::collections::HashSet;

use serde::Serialize;

use lacre_core::{SealId, SectorId};

use crate::error::EngineError;
use crate::model::{BlockClaim, SectorBlock};
use crate::SealEngine;

/// Split `ids` (ascending) into one contiguous block per sector, in sector
/// order. Every sector gets a block, possibly empty. Returns nothing when
/// `sectors` is empty.
pub fn plan_blocks(ids: &[SealId], sectors: &[SectorId]) -> Vec<SectorBlock> {
    let n = sectors.len();
    if n == 0 {
        return Vec::new();
    }
    let base = ids.len() / n;
    let remainder = ids.len() % n;

    let mut blocks = Vec::with_capacity(n);
    let mut offset = 0;
    for (i, sector) in sectors.iter().enumerate() {
        let size = if i < remainder { base + 1 } else { base };
        blocks.push(SectorBlock {
            sector_id: *sector,
            seal_ids: ids[offset..offset + size].to_vec(),
        });
        offset += size;
    }
    blocks
}

/// Result of a manual distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualDistribution {
    pub sector_id: SectorId,
    pub requested: u64,
    /// `min(requested, available)` barring concurrent claims.
    pub distributed: u64,
    pub seal_ids: Vec<SealId>,
}

/// Result of an automatic distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutomaticDistribution {
    pub sector_count: u64,
    /// Size of the pool the plan was built from.
    pub planned: u64,
    pub distributed: u64,
    /// One entry per sector, in request order.
    pub allocations: Vec<BlockClaim>,
}

impl SealEngine {
    /// Give up to `quantity` of the oldest available seals to `sector`.
    pub async fn distribute_manual(
        &self,
        sector: SectorId,
        quantity: i64,
    ) -> Result<ManualDistribution, EngineError> {
        if quantity <= 0 {
            return Err(EngineError::Validation(format!(
                "quantity must be a positive integer, got {quantity}"
            )));
        }
        self.ensure_sectors_exist("distribute_manual", &[sector])
            .await?;

        let requested = quantity as u64;
        let seal_ids = self
            .store
            .claim_oldest(sector, requested)
            .await
            .map_err(EngineError::store("distribute_manual"))?;
        let distributed = seal_ids.len() as u64;

        if distributed < requested {
            tracing::warn!(
                sector_id = %sector,
                requested,
                distributed,
                "manual distribution partially fulfilled"
            );
        } else {
            tracing::info!(sector_id = %sector, distributed, "manual distribution complete");
        }

        Ok(ManualDistribution {
            sector_id: sector,
            requested,
            distributed,
            seal_ids,
        })
    }

    /// Split the available pool across `sectors` in contiguous blocks.
    pub async fn distribute_automatic(
        &self,
        sectors: &[SectorId],
        cap: Option<i64>,
    ) -> Result<AutomaticDistribution, EngineError> {
        if sectors.is_empty() {
            return Err(EngineError::Validation(
                "sector list must not be empty".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(sectors.len());
        if let Some(dup) = sectors.iter().find(|s| !seen.insert(**s)) {
            return Err(EngineError::Validation(format!(
                "sector id {} appears more than once",
                dup.get()
            )));
        }
        let limit = match cap {
            Some(c) if c <= 0 => {
                return Err(EngineError::Validation(format!(
                    "total cap must be a positive integer, got {c}"
                )))
            }
            Some(c) => Some(c as u64),
            None => None,
        };
        self.ensure_sectors_exist("distribute_automatic", sectors)
            .await?;

        let ids = self
            .store
            .available_ids(limit)
            .await
            .map_err(EngineError::store("distribute_automatic"))?;
        let sector_count = sectors.len() as u64;
        if ids.is_empty() {
            tracing::info!(sector_count, "automatic distribution: no available seals");
            return Ok(AutomaticDistribution {
                sector_count,
                planned: 0,
                distributed: 0,
                allocations: sectors
                    .iter()
                    .map(|s| BlockClaim {
                        sector_id: *s,
                        planned: 0,
                        claimed: Vec::new(),
                    })
                    .collect(),
            });
        }

        let blocks = plan_blocks(&ids, sectors);
        let allocations = self
            .store
            .claim_blocks(&blocks)
            .await
            .map_err(EngineError::store("distribute_automatic"))?;

        let planned = ids.len() as u64;
        let distributed: u64 = allocations.iter().map(|a| a.claimed.len() as u64).sum();
        if distributed < planned {
            tracing::warn!(
                sector_count,
                planned,
                distributed,
                "automatic distribution partially fulfilled; seals were claimed concurrently"
            );
        } else {
            tracing::info!(sector_count, distributed, "automatic distribution complete");
        }

        Ok(AutomaticDistribution {
            sector_count,
            planned,
            distributed,
            allocations,
        })
    }
}
