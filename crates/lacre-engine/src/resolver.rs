//! # Status Resolver
//!
//! Lists the seals a sector holds with their resolved availability. The
//! precedence rules live in [`lacre_state::resolve_availability`]; this
//! module only gathers the two inputs, the stored record and the package
//! backlink, in two batched reads.

use serde::Serialize;

use lacre_core::{SealId, SectorId};
use lacre_state::{resolve_availability, Availability};

use crate::error::EngineError;
use crate::model::Seal;
use crate::SealEngine;

/// A held seal with its display-time availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSeal {
    #[serde(flatten)]
    pub seal: Seal,
    pub availability: Availability,
    /// Whether any package record references the seal.
    pub has_package_link: bool,
}

impl ResolvedSeal {
    pub fn label(&self) -> &'static str {
        self.availability.label()
    }
}

impl SealEngine {
    /// Every seal held by `sector`, newest first, with resolved availability.
    pub async fn sector_availability(
        &self,
        sector: SectorId,
    ) -> Result<Vec<ResolvedSeal>, EngineError> {
        let seals = self
            .store
            .seals_held_by(sector)
            .await
            .map_err(EngineError::store("sector_availability"))?;
        if seals.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<SealId> = seals.iter().map(|s| s.id).collect();
        let linked = self
            .packages
            .seals_with_packages(&ids)
            .await
            .map_err(EngineError::store("sector_availability"))?;

        let resolved: Vec<ResolvedSeal> = seals
            .into_iter()
            .map(|seal| {
                let has_package_link =
                    seal.linked_package_id.is_some() || linked.contains(&seal.id);
                let availability = resolve_availability(seal.status, has_package_link);
                if has_package_link && resolve_availability(seal.status, false) == Availability::Available {
                    tracing::debug!(seal_id = %seal.id, status = %seal.status, "package backlink overrides stored status");
                }
                ResolvedSeal {
                    availability,
                    has_package_link,
                    seal,
                }
            })
            .collect();

        let available = resolved
            .iter()
            .filter(|r| r.availability == Availability::Available)
            .count();
        tracing::debug!(sector_id = %sector, held = resolved.len(), available, "sector availability resolved");
        Ok(resolved)
    }
}
