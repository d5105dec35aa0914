//! # Destruction Guard
//!
//! Lot destruction is all or nothing. If any seal of the lot is not
//! `available`, has a holding sector, or carries a package link, the whole
//! request is refused and nothing changes. A lot with no seals "succeeds"
//! with zero rows.
//!
//! Single seals may also be destroyed, but only while `available`, with no
//! sector and no package referencing them.

use serde::Serialize;

use lacre_core::{LotNumber, SealId, SealStatus};
use lacre_state::check_transition;

use crate::error::EngineError;
use crate::model::{ConditionalUpdate, LotDestruction, Seal, SealChange};
use crate::SealEngine;

/// Result of a successful lot destruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LotDestroyed {
    pub lot_number: LotNumber,
    pub destroyed: u64,
}

fn require_reason(reason: &str) -> Result<String, EngineError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(lacre_state::SealLifecycleError::MissingDestructionReason.into());
    }
    Ok(trimmed.to_string())
}

impl SealEngine {
    /// Destroy every seal in `lot`, or none of them.
    pub async fn destroy_lot(&self, lot: &str, reason: &str) -> Result<LotDestroyed, EngineError> {
        let lot = LotNumber::new(lot)?;
        let reason = require_reason(reason)?;

        let outcome = self
            .store
            .destroy_lot(&lot, &reason)
            .await
            .map_err(EngineError::store("destroy_lot"))?;
        match outcome {
            LotDestruction::Destroyed { rows } => {
                tracing::info!(lot = %lot, destroyed = rows, "lot destroyed");
                Ok(LotDestroyed {
                    lot_number: lot,
                    destroyed: rows,
                })
            }
            LotDestruction::Blocked { held } => {
                tracing::warn!(lot = %lot, held, "lot destruction refused");
                Err(EngineError::GuardViolation {
                    lot: lot.as_str().to_string(),
                    held,
                })
            }
        }
    }

    /// Destroy one unheld, unlinked `available` seal.
    pub async fn destroy_seal(&self, id: SealId, reason: &str) -> Result<Seal, EngineError> {
        let reason = require_reason(reason)?;
        let seal = self.get(id).await?;
        check_transition(seal.status, SealStatus::Destroyed)?;
        if let Some(sector) = seal.sector_id {
            return Err(EngineError::Conflict(format!("{id} is held by {sector}")));
        }
        if seal.linked_package_id.is_some() {
            return Err(EngineError::Conflict(format!("{id} is referenced by a package")));
        }
        self.ensure_no_package_backlink("destroy_seal", id).await?;

        let change = SealChange {
            status: SealStatus::Destroyed,
            sector_id: None,
            destruction_reason: Some(reason),
            ..SealChange::from_seal(&seal)
        };
        match self
            .store
            .update_seal(&seal, &change)
            .await
            .map_err(EngineError::store("destroy_seal"))?
        {
            ConditionalUpdate::Applied(updated) => {
                tracing::info!(seal_id = %id, code = %updated.code, "seal destroyed");
                Ok(updated)
            }
            ConditionalUpdate::Missing => Err(EngineError::NotFound(id.to_string())),
            ConditionalUpdate::Stale => Err(EngineError::Stale(id)),
        }
    }
}
