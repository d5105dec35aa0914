//! # lacre-engine — Seal Lifecycle & Distribution Engine
//!
//! Mints seal codes, hands seals out to sectors, resolves their availability
//! and guards their destruction. All persistence goes through the
//! [`SealStore`] repository trait so the engine runs unchanged against
//! Postgres (in `lacre-api`) or the in-memory store in [`memory`].
//!
//! ## Components
//!
//! | Module | Operations |
//! |--------|------------|
//! | `generator` | [`SealEngine::generate`] |
//! | `distribution` | [`SealEngine::distribute_manual`], [`SealEngine::distribute_automatic`], [`plan_blocks`] |
//! | `resolver` | [`SealEngine::sector_availability`] |
//! | `destruction` | [`SealEngine::destroy_lot`], [`SealEngine::destroy_seal`] |
//! | `query` | [`SealEngine::list`], [`SealEngine::get`], [`SealEngine::lot_summaries`], [`SealEngine::next_number`] |
//! | `lifecycle` | [`SealEngine::update_seal`], [`SealEngine::consume_seal`], [`SealEngine::delete_seal`] |
//!
//! ## Concurrency
//!
//! The engine holds no mutable state. The store is the serialization point:
//! every multi-row write is one atomic unit, and claims only touch rows that
//! still match `status = available`.

use std::sync::Arc;

pub mod destruction;
pub mod distribution;
pub mod error;
pub mod generator;
pub mod lifecycle;
pub mod memory;
pub mod model;
pub mod query;
pub mod resolver;
pub mod store;

pub use destruction::LotDestroyed;
pub use distribution::{plan_blocks, AutomaticDistribution, ManualDistribution};
pub use error::{EngineError, StoreError};
pub use generator::{GenerateSeals, GenerationReport, MAX_CODES_PER_REQUEST};
pub use lifecycle::{ConsumeSeal, SealPatch};
pub use memory::{MemoryPackageRegistry, MemorySealStore, MemorySectorDirectory};
pub use model::{
    BlockClaim, ConditionalUpdate, LotDestruction, LotSummary, PageRequest, Seal, SealChange,
    SealFilter, SealPage, SectorBlock, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
pub use query::NextNumber;
pub use resolver::ResolvedSeal;
pub use store::{PackageRegistry, SealStore, SectorDirectory};

/// Entry point for every seal operation.
///
/// Cheap to clone; clones share the same backends.
#[derive(Clone)]
pub struct SealEngine {
    store: Arc<dyn SealStore>,
    packages: Arc<dyn PackageRegistry>,
    sectors: Arc<dyn SectorDirectory>,
}

impl SealEngine {
    pub fn new(
        store: Arc<dyn SealStore>,
        packages: Arc<dyn PackageRegistry>,
        sectors: Arc<dyn SectorDirectory>,
    ) -> Self {
        Self {
            store,
            packages,
            sectors,
        }
    }

    /// The underlying seal store.
    pub fn store(&self) -> &Arc<dyn SealStore> {
        &self.store
    }

    /// Reject sector ids the directory does not know.
    async fn ensure_sectors_exist(
        &self,
        operation: &'static str,
        sectors: &[lacre_core::SectorId],
    ) -> Result<(), EngineError> {
        let unknown = self
            .sectors
            .unknown_sectors(sectors)
            .await
            .map_err(EngineError::store(operation))?;
        if unknown.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = unknown.iter().map(|s| s.get().to_string()).collect();
        Err(EngineError::Validation(format!(
            "unknown sector id(s): {}",
            ids.join(", ")
        )))
    }

    /// Refuse when the package registry still references `id`.
    async fn ensure_no_package_backlink(
        &self,
        operation: &'static str,
        id: lacre_core::SealId,
    ) -> Result<(), EngineError> {
        let linked = self
            .packages
            .seals_with_packages(&[id])
            .await
            .map_err(EngineError::store(operation))?;
        if linked.contains(&id) {
            return Err(EngineError::Conflict(format!("{id} is referenced by a package")));
        }
        Ok(())
    }
}
