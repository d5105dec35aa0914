//! # Application State
//!
//! Shared state handed to every handler: the [`SealEngine`], the optional
//! Postgres pool used by the readiness probe, configuration, and metrics.
//!
//! Two backends are supported. With a pool, the engine runs on the
//! Postgres stores in [`crate::db`]. Without one, it runs on the in-memory
//! stores from `lacre-engine` and all state is lost on restart.

use std::sync::Arc;

use sqlx::PgPool;

use lacre_core::SectorId;
use lacre_engine::{MemoryPackageRegistry, MemorySealStore, MemorySectorDirectory, SealEngine};

use crate::auth::SecretToken;
use crate::db::directory::{PgPackageRegistry, PgSectorDirectory};
use crate::db::seals::PgSealStore;
use crate::middleware::metrics::ApiMetrics;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared operator bearer token. `None` disables authentication.
    pub auth_token: Option<SecretToken>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
        }
    }
}

/// State shared by all handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub engine: SealEngine,
    /// Present when running against Postgres.
    pub db_pool: Option<PgPool>,
    pub config: AppConfig,
    pub metrics: ApiMetrics,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("db_pool", &self.db_pool.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// In-memory backends. Only `sectors` are accepted as distribution
    /// targets; no package references any seal.
    pub fn in_memory(config: AppConfig, sectors: impl IntoIterator<Item = SectorId>) -> Self {
        let engine = SealEngine::new(
            Arc::new(MemorySealStore::new()),
            Arc::new(MemoryPackageRegistry::new()),
            Arc::new(MemorySectorDirectory::with_sectors(sectors)),
        );
        Self::from_engine(config, engine, None)
    }

    /// Postgres backends sharing one pool.
    pub fn with_pool(config: AppConfig, pool: PgPool) -> Self {
        let engine = SealEngine::new(
            Arc::new(PgSealStore::new(pool.clone())),
            Arc::new(PgPackageRegistry::new(pool.clone())),
            Arc::new(PgSectorDirectory::new(pool.clone())),
        );
        Self::from_engine(config, engine, Some(pool))
    }

    /// Wrap an engine built elsewhere, e.g. over custom test backends.
    pub fn from_engine(config: AppConfig, engine: SealEngine, db_pool: Option<PgPool>) -> Self {
        Self {
            engine,
            db_pool,
            config,
            metrics: ApiMetrics::new(),
        }
    }
}
