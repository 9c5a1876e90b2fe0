//! Campaign pacing configuration handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use zaprust_storage::models::{CampaignStatus, SendingConfiguration};
use zaprust_storage::repository::{CampaignRepository, SendingConfigRepository};

use super::ErrorResponse;
use crate::state::AppState;

/// Pacing configuration payload
#[derive(Debug, Serialize, Deserialize)]
pub struct PacingConfigBody {
    pub min_delay_seconds: i32,
    pub max_delay_seconds: i32,
    #[serde(default)]
    pub pause_after_messages: i32,
    #[serde(default)]
    pub pause_duration_seconds: i32,
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
    pub daily_limit: Option<i32>,
    pub allowed_hours_start: Option<i32>,
    pub allowed_hours_end: Option<i32>,
}

fn default_max_retries() -> i32 {
    3
}

impl From<SendingConfiguration> for PacingConfigBody {
    fn from(c: SendingConfiguration) -> Self {
        Self {
            min_delay_seconds: c.min_delay_seconds,
            max_delay_seconds: c.max_delay_seconds,
            pause_after_messages: c.pause_after_messages,
            pause_duration_seconds: c.pause_duration_seconds,
            max_retries: c.max_retries,
            daily_limit: c.daily_limit,
            allowed_hours_start: c.allowed_hours_start,
            allowed_hours_end: c.allowed_hours_end,
        }
    }
}

fn validate(body: &PacingConfigBody) -> Result<(), &'static str> {
    if body.min_delay_seconds < 0 || body.max_delay_seconds < 0 {
        return Err("Delays must be non-negative");
    }
    if body.min_delay_seconds > body.max_delay_seconds {
        return Err("min_delay_seconds must not exceed max_delay_seconds");
    }
    if body.max_retries < 0 {
        return Err("max_retries must be non-negative");
    }
    if let Some(limit) = body.daily_limit {
        if limit <= 0 {
            return Err("daily_limit must be positive");
        }
    }
    for hour in [body.allowed_hours_start, body.allowed_hours_end]
        .into_iter()
        .flatten()
    {
        if !(0..24).contains(&hour) {
            return Err("Allowed hours must be in 0..24");
        }
    }
    if body.allowed_hours_start.is_some() != body.allowed_hours_end.is_some() {
        return Err("allowed_hours_start and allowed_hours_end must be provided together");
    }
    Ok(())
}

async fn require_campaign(
    state: &AppState,
    tenant_id: Uuid,
    campaign_id: Uuid,
) -> Result<CampaignStatus, (StatusCode, Json<ErrorResponse>)> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    let campaign = repo
        .get_by_tenant(tenant_id, campaign_id)
        .await
        .map_err(|e| {
            error!("Failed to load campaign: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("internal_error", "Failed to load campaign")),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new("not_found", "Campaign not found")),
            )
        })?;

    campaign.status_enum().ok_or_else(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "internal_error",
                "Campaign has an invalid status",
            )),
        )
    })
}

/// Get a campaign's pacing configuration
///
/// GET /api/v1/tenants/:tenant_id/campaigns/:campaign_id/pacing
pub async fn get_pacing(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, campaign_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<PacingConfigBody>, (StatusCode, Json<ErrorResponse>)> {
    require_campaign(&state, tenant_id, campaign_id).await?;

    let repo = SendingConfigRepository::new(state.db_pool.pool().clone());
    let config = repo
        .get_by_campaign(campaign_id)
        .await
        .map_err(|e| {
            error!("Failed to load pacing configuration: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "internal_error",
                    "Failed to load pacing configuration",
                )),
            )
        })?
        .unwrap_or_else(|| SendingConfiguration::defaults_for(campaign_id));

    Ok(Json(PacingConfigBody::from(config)))
}

/// Set a campaign's pacing configuration.
///
/// Pacing is fixed once the campaign starts running.
///
/// PUT /api/v1/tenants/:tenant_id/campaigns/:campaign_id/pacing
pub async fn set_pacing(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, campaign_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<PacingConfigBody>,
) -> Result<Json<PacingConfigBody>, (StatusCode, Json<ErrorResponse>)> {
    if let Err(message) = validate(&body) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("validation_error", message)),
        ));
    }

    let status = require_campaign(&state, tenant_id, campaign_id).await?;

    if !matches!(status, CampaignStatus::Draft | CampaignStatus::Scheduled) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "validation_error",
                "Pacing can only be changed before the campaign starts",
            )),
        ));
    }

    let mut config = SendingConfiguration::defaults_for(campaign_id);
    config.min_delay_seconds = body.min_delay_seconds;
    config.max_delay_seconds = body.max_delay_seconds;
    config.pause_after_messages = body.pause_after_messages;
    config.pause_duration_seconds = body.pause_duration_seconds;
    config.max_retries = body.max_retries;
    config.daily_limit = body.daily_limit;
    config.allowed_hours_start = body.allowed_hours_start;
    config.allowed_hours_end = body.allowed_hours_end;

    let repo = SendingConfigRepository::new(state.db_pool.pool().clone());
    repo.upsert(&config).await.map_err(|e| {
        error!("Failed to store pacing configuration: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "internal_error",
                "Failed to store pacing configuration",
            )),
        )
    })?;

    info!(campaign_id = %campaign_id, "Pacing configuration updated");

    Ok(Json(PacingConfigBody::from(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> PacingConfigBody {
        PacingConfigBody {
            min_delay_seconds: 5,
            max_delay_seconds: 30,
            pause_after_messages: 0,
            pause_duration_seconds: 0,
            max_retries: 3,
            daily_limit: None,
            allowed_hours_start: None,
            allowed_hours_end: None,
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(validate(&body()).is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_delays() {
        let mut b = body();
        b.min_delay_seconds = 60;
        b.max_delay_seconds = 10;
        assert!(validate(&b).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_hours() {
        let mut b = body();
        b.allowed_hours_start = Some(9);
        b.allowed_hours_end = Some(24);
        assert!(validate(&b).is_err());

        b.allowed_hours_end = None;
        assert!(validate(&b).is_err());

        b.allowed_hours_end = Some(18);
        assert!(validate(&b).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_daily_limit() {
        let mut b = body();
        b.daily_limit = Some(0);
        assert!(validate(&b).is_err());
    }
}
