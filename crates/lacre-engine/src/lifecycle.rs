//! # Single-Seal Lifecycle Operations
//!
//! Partial updates, consumption against a package, and the administrative
//! hard delete.
//!
//! Updates and consumption are read, decide, then write conditionally on the
//! record that was read. If another writer got there first the operation
//! fails with [`EngineError::Stale`] instead of overwriting.
//!
//! Consumption writes `status = used` and the package id in the same
//! conditional write, so a consumed seal never depends on the package
//! backlink to resolve as unavailable.

use serde::{Deserialize, Serialize};

use lacre_core::{PackageId, SealId, SealStatus, SectorId};
use lacre_state::{check_transition, is_final, SealLifecycleError};

use crate::error::EngineError;
use crate::model::{ConditionalUpdate, Seal, SealChange};
use crate::SealEngine;

/// Partial update of one seal. At least one field must be present.
///
/// Omitted fields keep their stored value. `sector_id` and
/// `linked_package_id` are tri-state: `Some(None)` clears the stored value.
/// `status` accepts any spelling [`SealStatus::canonicalize`] understands;
/// the canonical form is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub sector_id: Option<Option<i64>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub linked_package_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destruction_reason: Option<String>,
}

impl SealPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.sector_id.is_none()
            && self.linked_package_id.is_none()
            && self.destruction_reason.is_none()
    }
}

/// Consumption of a held seal on a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeSeal {
    pub package_id: i64,
    /// Sector sealing the package; must be the seal's holder.
    pub sector_id: i64,
}

/// Parsed and validated fields of a [`SealPatch`].
struct ParsedPatch {
    status: Option<SealStatus>,
    sector: Option<Option<SectorId>>,
    package: Option<Option<PackageId>>,
    reason: Option<String>,
}

fn parse_patch(patch: &SealPatch) -> Result<ParsedPatch, EngineError> {
    if patch.is_empty() {
        return Err(EngineError::Validation(
            "at least one of status, sector_id, linked_package_id or destruction_reason is required"
                .to_string(),
        ));
    }
    let status = patch
        .status
        .as_deref()
        .map(str::parse::<SealStatus>)
        .transpose()?;
    let sector = patch
        .sector_id
        .map(|v| v.map(SectorId::new).transpose())
        .transpose()?;
    let package = patch
        .linked_package_id
        .map(|v| v.map(PackageId::new).transpose())
        .transpose()?;
    let reason = match patch.destruction_reason.as_deref() {
        Some(r) if r.trim().is_empty() => {
            return Err(EngineError::Validation(
                "destruction_reason must not be blank".to_string(),
            ))
        }
        Some(r) => Some(r.trim().to_string()),
        None => None,
    };
    Ok(ParsedPatch {
        status,
        sector,
        package,
        reason,
    })
}

/// Apply `patch` to `seal`, enforcing the lifecycle rules.
fn resolve_change(seal: &Seal, patch: ParsedPatch) -> Result<SealChange, EngineError> {
    if is_final(seal.status) {
        return Err(SealLifecycleError::FinalState { state: seal.status }.into());
    }
    let target = patch.status.unwrap_or(seal.status);
    check_transition(seal.status, target)?;

    let mut change = SealChange {
        status: target,
        ..SealChange::from_seal(seal)
    };
    if let Some(sector) = patch.sector {
        change.sector_id = sector;
    }
    if let Some(package) = patch.package {
        change.linked_package_id = package;
    }
    if let Some(reason) = patch.reason {
        change.destruction_reason = Some(reason);
    }

    match target {
        SealStatus::Available => {
            if matches!(patch.sector, Some(Some(_))) {
                return Err(EngineError::Validation(
                    "an available seal cannot be held by a sector".to_string(),
                ));
            }
            change.sector_id = None;
        }
        SealStatus::Assigned | SealStatus::Reserved | SealStatus::Linked => {
            if change.sector_id.is_none() {
                return Err(EngineError::Validation(format!(
                    "status {target} requires a sector_id"
                )));
            }
        }
        SealStatus::Used => {
            if change.linked_package_id.is_none() {
                return Err(EngineError::Validation(
                    "status used requires a linked_package_id".to_string(),
                ));
            }
        }
        SealStatus::Destroyed => {
            if change.destruction_reason.is_none() {
                return Err(SealLifecycleError::MissingDestructionReason.into());
            }
            if change.linked_package_id.is_some() {
                return Err(EngineError::Conflict(format!(
                    "{} is referenced by a package",
                    seal.id
                )));
            }
            change.sector_id = None;
        }
        SealStatus::Lost | SealStatus::Damaged => {}
    }
    Ok(change)
}

impl SealEngine {
    /// Apply a partial update under the lifecycle rules.
    pub async fn update_seal(&self, id: SealId, patch: &SealPatch) -> Result<Seal, EngineError> {
        let parsed = parse_patch(patch)?;
        let new_sector = parsed.sector.flatten();
        let seal = self.get(id).await?;
        let change = resolve_change(&seal, parsed)?;
        if change.status == SealStatus::Destroyed {
            self.ensure_no_package_backlink("update_seal", id).await?;
        }
        if let Some(sector) = new_sector {
            self.ensure_sectors_exist("update_seal", &[sector]).await?;
        }
        let updated = self.write_conditionally(&seal, &change, "update_seal").await?;
        tracing::info!(
            seal_id = %id,
            from = %seal.status,
            to = %updated.status,
            "seal updated"
        );
        Ok(updated)
    }

    /// Mark a held seal as used on `package`.
    pub async fn consume_seal(&self, id: SealId, request: ConsumeSeal) -> Result<Seal, EngineError> {
        let package = PackageId::new(request.package_id)?;
        let sector = SectorId::new(request.sector_id)?;
        let seal = self.get(id).await?;

        if !seal.status.is_held() {
            return Err(if is_final(seal.status) {
                SealLifecycleError::FinalState { state: seal.status }
            } else {
                SealLifecycleError::InvalidTransition {
                    from: seal.status,
                    to: SealStatus::Used,
                }
            }
            .into());
        }
        if seal.sector_id != Some(sector) {
            return Err(EngineError::Conflict(format!("{id} is not held by {sector}")));
        }

        let change = SealChange {
            status: SealStatus::Used,
            linked_package_id: Some(package),
            ..SealChange::from_seal(&seal)
        };
        let updated = self.write_conditionally(&seal, &change, "consume_seal").await?;
        tracing::info!(seal_id = %id, package_id = %package, sector_id = %sector, "seal consumed");
        Ok(updated)
    }

    /// Administrative hard delete. Bypasses every lifecycle rule.
    pub async fn delete_seal(&self, id: SealId) -> Result<(), EngineError> {
        let removed = self
            .store
            .delete_seal(id)
            .await
            .map_err(EngineError::store("delete_seal"))?;
        if !removed {
            return Err(EngineError::NotFound(id.to_string()));
        }
        tracing::warn!(seal_id = %id, "seal deleted administratively");
        Ok(())
    }

    async fn write_conditionally(
        &self,
        seal: &Seal,
        change: &SealChange,
        operation: &'static str,
    ) -> Result<Seal, EngineError> {
        match self
            .store
            .update_seal(seal, change)
            .await
            .map_err(EngineError::store(operation))?
        {
            ConditionalUpdate::Applied(updated) => Ok(updated),
            ConditionalUpdate::Missing => Err(EngineError::NotFound(seal.id.to_string())),
            ConditionalUpdate::Stale => {
                tracing::warn!(seal_id = %seal.id, operation, "conditional write lost a race");
                Err(EngineError::Stale(seal.id))
            }
        }
    }
}
