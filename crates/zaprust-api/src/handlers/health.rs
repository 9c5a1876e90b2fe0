//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Detailed health response
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub processor_running: bool,
}

/// Basic health check
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Liveness probe
///
/// GET /health/live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe - verifies database connectivity
///
/// GET /health/ready
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.db_pool.health_check().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Detailed health status
///
/// GET /health/detailed
pub async fn health_detailed(
    State(state): State<Arc<AppState>>,
) -> Json<DetailedHealthResponse> {
    let database = state.db_pool.health_check().await.is_ok();

    Json(DetailedHealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
        processor_running: state.processor.is_running(),
    })
}
