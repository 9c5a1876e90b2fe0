//! Campaign handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use zaprust_core::dispatch::manager::{CampaignError, CampaignStats};
use zaprust_storage::models::{Campaign, CampaignStatus, CreateCampaign, QueueTask};
use zaprust_storage::repository::{CampaignRepository, MessageQueueRepository};

use super::ErrorResponse;
use crate::state::AppState;

/// Query parameters for listing campaigns
#[derive(Debug, Deserialize)]
pub struct ListCampaignsQuery {
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Campaign list response
#[derive(Debug, Serialize)]
pub struct CampaignListResponse {
    pub data: Vec<CampaignResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Campaign response
#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub message_content: String,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub api_config_id: Uuid,
    pub status: String,
    pub total_contacts: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub progress_percentage: f64,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignResponse {
    fn from(c: Campaign) -> Self {
        let progress = c.progress_percentage();
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            message_content: c.message_content,
            media_url: c.media_url,
            media_type: c.media_type,
            api_config_id: c.api_config_id,
            status: c.status,
            total_contacts: c.total_contacts,
            sent_count: c.sent_count,
            failed_count: c.failed_count,
            progress_percentage: progress,
            scheduled_at: c.scheduled_at,
            started_at: c.started_at,
            completed_at: c.completed_at,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Request body for creating a campaign
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub description: Option<String>,
    pub message_content: String,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub api_config_id: Uuid,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Request body for scheduling a campaign
#[derive(Debug, Deserialize)]
pub struct ScheduleCampaignRequest {
    pub scheduled_at: DateTime<Utc>,
}

fn campaign_error_response(e: CampaignError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, message) = match &e {
        CampaignError::NotFound => (StatusCode::NOT_FOUND, "Campaign not found"),
        CampaignError::NotStartable => (
            StatusCode::BAD_REQUEST,
            "Campaign is not in draft or scheduled status",
        ),
        CampaignError::NotRunning => (StatusCode::BAD_REQUEST, "Campaign is not running"),
        CampaignError::NotPaused => (StatusCode::BAD_REQUEST, "Campaign is not paused"),
        CampaignError::NotCancellable => {
            (StatusCode::BAD_REQUEST, "Campaign cannot be cancelled")
        }
        CampaignError::NoContacts => (StatusCode::BAD_REQUEST, "Campaign has no contacts"),
        CampaignError::Database(_) | CampaignError::Internal(_) => {
            error!("Campaign operation failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    };

    (
        status,
        Json(ErrorResponse::new("campaign_error", message)),
    )
}

/// List campaigns for a tenant
///
/// GET /api/v1/tenants/:tenant_id/campaigns
pub async fn list_campaigns(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<ListCampaignsQuery>,
) -> Result<Json<CampaignListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    let status = query.status.and_then(|s| s.parse::<CampaignStatus>().ok());

    let campaigns = repo
        .list_by_tenant(tenant_id, status, query.limit, query.offset)
        .await
        .map_err(|e| {
            error!("Failed to list campaigns: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "internal_error",
                    "Failed to list campaigns",
                )),
            )
        })?;

    let total = repo.count_by_tenant(tenant_id, status).await.unwrap_or(0);

    let data = campaigns.into_iter().map(CampaignResponse::from).collect();

    Ok(Json(CampaignListResponse {
        data,
        total,
        limit: query.limit,
        offset: query.offset,
    }))
}

/// Create a new campaign
///
/// POST /api/v1/tenants/:tenant_id/campaigns
pub async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<Uuid>,
    Json(input): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<CampaignResponse>), (StatusCode, Json<ErrorResponse>)> {
    if input.name.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "validation_error",
                "Campaign name is required",
            )),
        ));
    }

    if input.message_content.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "validation_error",
                "Message content is required",
            )),
        ));
    }

    if input.media_url.is_some() != input.media_type.is_some() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "validation_error",
                "media_url and media_type must be provided together",
            )),
        ));
    }

    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    let create_input = CreateCampaign {
        tenant_id,
        name: input.name,
        description: input.description,
        message_content: input.message_content,
        media_url: input.media_url,
        media_type: input.media_type,
        api_config_id: input.api_config_id,
        scheduled_at: input.scheduled_at,
    };

    let campaign = repo.create(create_input).await.map_err(|e| {
        error!("Failed to create campaign: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "internal_error",
                "Failed to create campaign",
            )),
        )
    })?;

    info!("Created campaign {} for tenant {}", campaign.id, tenant_id);

    Ok((StatusCode::CREATED, Json(CampaignResponse::from(campaign))))
}

/// Get a campaign by ID
///
/// GET /api/v1/tenants/:tenant_id/campaigns/:campaign_id
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, campaign_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    let campaign = repo
        .get_by_tenant(tenant_id, campaign_id)
        .await
        .map_err(|e| {
            error!("Failed to get campaign: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "internal_error",
                    "Failed to get campaign",
                )),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new("not_found", "Campaign not found")),
            )
        })?;

    Ok(Json(CampaignResponse::from(campaign)))
}

/// Delete a draft campaign
///
/// DELETE /api/v1/tenants/:tenant_id/campaigns/:campaign_id
pub async fn delete_campaign(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, campaign_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    let deleted = repo.delete(campaign_id, tenant_id).await.map_err(|e| {
        error!("Failed to delete campaign: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "internal_error",
                "Failed to delete campaign",
            )),
        )
    })?;

    if deleted {
        info!("Deleted campaign {}", campaign_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "not_found",
                "Campaign not found or not in draft status",
            )),
        ))
    }
}

/// Start sending a campaign immediately
///
/// POST /api/v1/tenants/:tenant_id/campaigns/:campaign_id/start
pub async fn start_campaign(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, campaign_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    let campaign = state
        .campaign_manager
        .start_campaign(tenant_id, campaign_id)
        .await
        .map_err(campaign_error_response)?;

    info!("Started campaign {} for tenant {}", campaign_id, tenant_id);

    Ok(Json(CampaignResponse::from(campaign)))
}

/// Schedule a campaign for a later start
///
/// POST /api/v1/tenants/:tenant_id/campaigns/:campaign_id/schedule
pub async fn schedule_campaign(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, campaign_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<ScheduleCampaignRequest>,
) -> Result<Json<CampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    let campaign = state
        .campaign_manager
        .schedule_campaign(tenant_id, campaign_id, input.scheduled_at)
        .await
        .map_err(campaign_error_response)?;

    info!(
        "Scheduled campaign {} for tenant {}",
        campaign_id, tenant_id
    );

    Ok(Json(CampaignResponse::from(campaign)))
}

/// Pause a running campaign
///
/// POST /api/v1/tenants/:tenant_id/campaigns/:campaign_id/pause
pub async fn pause_campaign(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, campaign_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    let campaign = state
        .campaign_manager
        .pause_campaign(tenant_id, campaign_id)
        .await
        .map_err(campaign_error_response)?;

    info!("Paused campaign {}", campaign_id);

    Ok(Json(CampaignResponse::from(campaign)))
}

/// Resume a paused campaign
///
/// POST /api/v1/tenants/:tenant_id/campaigns/:campaign_id/resume
pub async fn resume_campaign(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, campaign_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    let campaign = state
        .campaign_manager
        .resume_campaign(tenant_id, campaign_id)
        .await
        .map_err(campaign_error_response)?;

    info!("Resumed campaign {}", campaign_id);

    Ok(Json(CampaignResponse::from(campaign)))
}

/// Cancel a campaign
///
/// POST /api/v1/tenants/:tenant_id/campaigns/:campaign_id/cancel
pub async fn cancel_campaign(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, campaign_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    let campaign = state
        .campaign_manager
        .cancel_campaign(tenant_id, campaign_id)
        .await
        .map_err(campaign_error_response)?;

    info!("Cancelled campaign {}", campaign_id);

    Ok(Json(CampaignResponse::from(campaign)))
}

/// Queue task response
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub contact_phone: String,
    pub status: String,
    pub scheduled_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub provider_message_id: Option<String>,
}

impl From<QueueTask> for TaskResponse {
    fn from(t: QueueTask) -> Self {
        Self {
            id: t.id,
            contact_phone: t.contact_phone,
            status: t.status,
            scheduled_at: t.scheduled_at,
            sent_at: t.sent_at,
            retry_count: t.retry_count,
            error_message: t.error_message,
            provider_message_id: t.provider_message_id,
        }
    }
}

/// List queue tasks for a campaign
///
/// GET /api/v1/tenants/:tenant_id/campaigns/:campaign_id/tasks
pub async fn list_campaign_tasks(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, campaign_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ListCampaignsQuery>,
) -> Result<Json<Vec<TaskResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let repo = CampaignRepository::new(state.db_pool.pool().clone());

    repo.get_by_tenant(tenant_id, campaign_id)
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

    let queue_repo = MessageQueueRepository::new(state.db_pool.pool().clone());
    let tasks = queue_repo
        .list_by_campaign(campaign_id, query.limit, query.offset)
        .await
        .map_err(|e| {
            error!("Failed to list tasks: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("internal_error", "Failed to list tasks")),
            )
        })?;

    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// Get campaign statistics
///
/// GET /api/v1/tenants/:tenant_id/campaigns/:campaign_id/stats
pub async fn get_campaign_stats(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, campaign_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CampaignStats>, (StatusCode, Json<ErrorResponse>)> {
    let stats = state
        .campaign_manager
        .campaign_stats(tenant_id, campaign_id)
        .await
        .map_err(campaign_error_response)?;

    Ok(Json(stats))
}
