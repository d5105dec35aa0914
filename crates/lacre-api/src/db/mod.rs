//! # Database Persistence Layer
//!
//! Postgres implementations of the engine's repository traits via SQLx.
//!
//! The database layer is optional. When a database URL is configured the
//! engine runs on [`seals::PgSealStore`] and the directory views in
//! [`directory`]. When absent, the API runs on the in-memory stores
//! (suitable for development and testing).
//!
//! ## What is owned here
//!
//! The `seals` table, created by the embedded migrations.
//!
//! ## What is read but not owned
//!
//! `sectors (id)` and `packages (id, seal_id)` belong to other services.
//! They are only queried, never written.

pub mod directory;
pub mod seals;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use lacre_engine::StoreError;

/// Connect to Postgres and run the embedded migrations.
pub async fn init_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(2.min(max_connections))
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!(max_connections, "connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(pool)
}

/// Convert a driver error into the engine's store error.
pub(crate) fn store_err(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}
