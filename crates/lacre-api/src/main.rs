//! # lacre-api — Binary Entry Point
//!
//! Parses configuration from flags and environment, connects to Postgres
//! when a database URL is given, and serves the API until Ctrl-C or SIGTERM.

use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use lacre_api::auth::SecretToken;
use lacre_api::state::{AppConfig, AppState};
use lacre_core::SectorId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Seal lifecycle and distribution service.
#[derive(Parser, Debug)]
#[command(name = "lacre-api", version, about, long_about = None)]
struct Cli {
    /// Port to bind the HTTP server to.
    #[arg(long, env = "LACRE_PORT", default_value_t = 8080)]
    port: u16,

    /// Postgres connection URL. Without it the service runs on in-memory
    /// stores and loses all state on restart.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Shared operator bearer token. Without it authentication is disabled.
    #[arg(long, env = "LACRE_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Maximum number of pooled database connections.
    #[arg(long, env = "LACRE_DB_MAX_CONNECTIONS", default_value_t = 20)]
    max_connections: u32,

    /// Sector ids accepted as distribution targets in in-memory mode.
    #[arg(long, env = "LACRE_MEMORY_SECTORS", value_delimiter = ',')]
    memory_sectors: Vec<i64>,

    /// Log output format.
    #[arg(long, env = "LACRE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let auth_token = cli.auth_token.filter(|t| !t.is_empty()).map(SecretToken::new);
    if auth_token.is_none() {
        tracing::warn!("LACRE_AUTH_TOKEN not set; authentication is disabled");
    }
    let config = AppConfig {
        port: cli.port,
        auth_token,
    };

    let state = match cli.database_url.as_deref() {
        Some(url) => {
            let pool = lacre_api::db::init_pool(url, cli.max_connections)
                .await
                .context("database initialization failed")?;
            AppState::with_pool(config, pool)
        }
        None => {
            let sectors = cli
                .memory_sectors
                .iter()
                .map(|id| SectorId::new(*id))
                .collect::<Result<Vec<_>, _>>()
                .context("invalid --memory-sectors")?;
            tracing::warn!(
                sectors = sectors.len(),
                "DATABASE_URL not set; running on in-memory stores. State will not survive restarts."
            );
            AppState::in_memory(config, sectors)
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let app = lacre_api::app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("lacre API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining connections");
}
