mod api;
mod config;
mod db;
mod error;
mod feed;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::config::{Config, POOL_ACQUIRE_TIMEOUT_SECS, POOL_MAX_CONNECTIONS};
use crate::db::store::connect_pool;
use crate::db::EventStore;
use crate::error::Result;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database pool (lazy: connections open on first request) ---
    let pool = connect_pool(&cfg)?;
    info!(
        database = %cfg.redacted_database_url(),
        max_connections = POOL_MAX_CONNECTIONS,
        acquire_timeout_secs = POOL_ACQUIRE_TIMEOUT_SECS,
        "Database pool configured"
    );

    let latency = Arc::new(LatencyStats::new());
    let store = EventStore::new(pool, Arc::clone(&latency));

    // --- HTTP server ---
    let app = router(ApiState { store, latency });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Intel feed listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
