//! Queue control handlers - the operator trigger surface

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use zaprust_core::dispatch::processor::TickSummary;
use zaprust_storage::models::QueueStatusCounts;

use super::ErrorResponse;
use crate::state::AppState;

/// Response for start/stop actions
#[derive(Debug, Serialize)]
pub struct ProcessorStateResponse {
    pub running: bool,
}

/// Run one dispatch tick now.
///
/// POST /api/v1/queue/process
///
/// If a tick is already executing the call returns immediately with
/// `skipped = true`.
pub async fn process_now(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TickSummary>, (StatusCode, Json<ErrorResponse>)> {
    let summary = state.processor.process_tick().await.map_err(|e| {
        error!("Manual queue processing failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "internal_error",
                "Queue processing failed",
            )),
        )
    })?;

    info!(
        claimed = summary.claimed,
        sent = summary.sent,
        skipped = summary.skipped,
        "Manual queue processing finished"
    );

    Ok(Json(summary))
}

/// Enable the periodic ticker
///
/// POST /api/v1/queue/start
pub async fn start_processor(State(state): State<Arc<AppState>>) -> Json<ProcessorStateResponse> {
    state.processor.start();
    Json(ProcessorStateResponse { running: true })
}

/// Disable the periodic ticker
///
/// POST /api/v1/queue/stop
pub async fn stop_processor(State(state): State<Arc<AppState>>) -> Json<ProcessorStateResponse> {
    state.processor.stop();
    Json(ProcessorStateResponse { running: false })
}

/// Queue status counts
///
/// GET /api/v1/queue/stats
pub async fn queue_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<QueueStatusCounts>, (StatusCode, Json<ErrorResponse>)> {
    let counts = state.processor.queue_stats().await.map_err(|e| {
        error!("Failed to get queue stats: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "internal_error",
                "Failed to get queue stats",
            )),
        )
    })?;

    Ok(Json(counts))
}
