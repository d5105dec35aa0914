//! # Query / Listing
//!
//! Read-only access for operators. Nothing here mutates the store.

use serde::Serialize;

use lacre_core::{SealCode, SealId, SealPrefix, SealStatus};

use crate::error::EngineError;
use crate::model::{LotSummary, PageRequest, Seal, SealFilter, SealPage, MAX_PAGE_LIMIT};
use crate::SealEngine;

/// Suggested start for the next generation run under a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextNumber {
    pub prefix: SealPrefix,
    /// Highest sequence number already used, if any.
    pub highest: Option<u64>,
    pub next: u64,
    pub next_code: SealCode,
}

impl SealEngine {
    /// Filtered page of seals, most recent first.
    pub async fn list(&self, filter: &SealFilter, page: PageRequest) -> Result<SealPage, EngineError> {
        if page.page == 0 {
            return Err(EngineError::Validation("page must be at least 1".to_string()));
        }
        if page.limit == 0 || page.limit > MAX_PAGE_LIMIT {
            return Err(EngineError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}, got {}",
                page.limit
            )));
        }
        self.store
            .list_seals(filter, &page)
            .await
            .map_err(EngineError::store("list_seals"))
    }

    pub async fn get(&self, id: SealId) -> Result<Seal, EngineError> {
        self.store
            .get_seal(id)
            .await
            .map_err(EngineError::store("get_seal"))?
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    /// Per-lot counters and whether each lot can currently be destroyed.
    pub async fn lot_summaries(&self) -> Result<Vec<LotSummary>, EngineError> {
        self.store
            .lot_summaries()
            .await
            .map_err(EngineError::store("lot_summaries"))
    }

    /// Highest sequence in use under `prefix` and the number after it.
    pub async fn next_number(&self, prefix: &str) -> Result<NextNumber, EngineError> {
        let prefix = SealPrefix::new(prefix)?;
        let highest = self
            .store
            .max_sequence(&prefix)
            .await
            .map_err(EngineError::store("next_number"))?;
        let next = highest.map_or(1, |h| h.saturating_add(1));
        Ok(NextNumber {
            next_code: SealCode::compose(&prefix, next),
            prefix,
            highest,
            next,
        })
    }

    /// Seal count per status, for the metrics gauge.
    pub async fn status_counts(&self) -> Result<Vec<(SealStatus, u64)>, EngineError> {
        self.store
            .count_by_status()
            .await
            .map_err(EngineError::store("status_counts"))
    }
}
