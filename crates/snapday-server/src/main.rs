//! # snapday-server
//!
//! HTTP front end for snapday, the one-post-per-day social feed.
//!
//! This binary provides:
//! - **REST API** (axum) over users, the friend graph, posts, likes,
//!   comments, the feed and discovery
//! - **Storage** in a SQLite file (default) or in process memory
//!
//! Callers are identified by the `x-user-id` header, which an upstream
//! authentication layer is expected to set.

mod api;
mod config;
mod error;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use snapday_shared::{Clock, SystemClock};
use snapday_social::Snapday;
use snapday_store::{KvStore, MemoryKv, SqliteKv};

use crate::api::AppState;
use crate::config::{ServerConfig, StorageBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,snapday_server=debug")),
        )
        .init();

    info!("Starting snapday server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    let clock: Arc<dyn Clock> = match config.utc_offset {
        Some(offset) => Arc::new(SystemClock::with_offset(offset)),
        None => Arc::new(SystemClock::local()),
    };

    // -----------------------------------------------------------------------
    // 3. Open storage and run the HTTP API (blocks until shutdown)
    // -----------------------------------------------------------------------
    match config.storage_backend {
        StorageBackend::Sqlite => {
            let kv = match &config.database_path {
                Some(path) => SqliteKv::open_at(path)?,
                None => SqliteKv::open_default()?,
            };
            run(kv, clock, &config).await
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; all data is lost on exit");
            run(MemoryKv::new(), clock, &config).await
        }
    }
}

async fn run<S: KvStore>(kv: S, clock: Arc<dyn Clock>, config: &ServerConfig) -> anyhow::Result<()> {
    let state = AppState {
        app: Snapday::new(Arc::new(kv), clock, config.social_settings()),
    };

    // Whichever finishes first wins; the other future is dropped.
    tokio::select! {
        result = api::serve(state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP API stopped");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    Ok(())
}
