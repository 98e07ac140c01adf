//! Readiness for the /health endpoint: one round-trip to the database plus pool gauges.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;

use crate::api::routes::ApiState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub db_reachable: bool,
    /// Open connections, idle or in use.
    pub pool_size: u32,
    pub pool_idle: usize,
}

pub async fn get_health(State(state): State<ApiState>) -> (StatusCode, Json<HealthResponse>) {
    let db_reachable = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Health check failed: {e}");
            false
        }
    };

    let pool = state.store.pool();
    let status = if db_reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            db_reachable,
            pool_size: pool.size(),
            pool_idle: pool.num_idle(),
        }),
    )
}
