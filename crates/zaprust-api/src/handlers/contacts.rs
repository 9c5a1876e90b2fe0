//! Campaign contact handlers
//!
//! Contacts arrive from the dashboard's import flow as already-parsed
//! JSON rows; this surface validates phone numbers and stores them.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use zaprust_common::types::PhoneNumber;
use zaprust_storage::models::{CampaignStatus, CreateContact};
use zaprust_storage::repository::{CampaignRepository, ContactRepository};

use super::ErrorResponse;
use crate::state::AppState;

/// One contact in an import request
#[derive(Debug, Deserialize)]
pub struct ImportContact {
    pub phone: String,
    pub name: Option<String>,
    pub attributes: Option<serde_json::Value>,
}

/// Request body for importing contacts
#[derive(Debug, Deserialize)]
pub struct ImportContactsRequest {
    pub contacts: Vec<ImportContact>,
}

/// Import summary
#[derive(Debug, Serialize)]
pub struct ImportContactsResponse {
    pub imported: u64,
    pub rejected: usize,
}

/// Query parameters for listing contacts
#[derive(Debug, Deserialize)]
pub struct ListContactsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

/// Contact response
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub id: Uuid,
    pub phone: String,
    pub name: Option<String>,
    pub status: String,
    pub sent_at: Option<chrono::DateTime<chrono::Utc>>,
    pub error_message: Option<String>,
}

/// Import contacts into a draft campaign
///
/// POST /api/v1/tenants/:tenant_id/campaigns/:campaign_id/contacts
pub async fn import_contacts(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, campaign_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<ImportContactsRequest>,
) -> Result<(StatusCode, Json<ImportContactsResponse>), (StatusCode, Json<ErrorResponse>)> {
    let campaign_repo = CampaignRepository::new(state.db_pool.pool().clone());

    let campaign = campaign_repo
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

    if campaign.status_enum() != Some(CampaignStatus::Draft) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "validation_error",
                "Contacts can only be imported into draft campaigns",
            )),
        ));
    }

    // Normalize phone numbers; rows that fail validation are dropped
    let mut rejected = 0usize;
    let contacts: Vec<CreateContact> = input
        .contacts
        .into_iter()
        .filter_map(|c| match PhoneNumber::parse(&c.phone) {
            Some(phone) => Some(CreateContact {
                campaign_id,
                phone: phone.digits().to_string(),
                name: c.name,
                attributes: c.attributes,
            }),
            None => {
                rejected += 1;
                None
            }
        })
        .collect();

    if contacts.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "validation_error",
                "No valid contacts in request",
            )),
        ));
    }

    let contact_repo = ContactRepository::new(state.db_pool.pool().clone());
    let imported = contact_repo.create_batch(contacts).await.map_err(|e| {
        error!("Failed to import contacts: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "internal_error",
                "Failed to import contacts",
            )),
        )
    })?;

    info!(
        campaign_id = %campaign_id,
        imported,
        rejected,
        "Imported contacts"
    );

    Ok((
        StatusCode::CREATED,
        Json(ImportContactsResponse { imported, rejected }),
    ))
}

/// List contacts for a campaign
///
/// GET /api/v1/tenants/:tenant_id/campaigns/:campaign_id/contacts
pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, campaign_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ListContactsQuery>,
) -> Result<Json<Vec<ContactResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let campaign_repo = CampaignRepository::new(state.db_pool.pool().clone());

    campaign_repo
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

    let contact_repo = ContactRepository::new(state.db_pool.pool().clone());
    let contacts = contact_repo
        .list_by_campaign(campaign_id, query.limit, query.offset)
        .await
        .map_err(|e| {
            error!("Failed to list contacts: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "internal_error",
                    "Failed to list contacts",
                )),
            )
        })?;

    Ok(Json(
        contacts
            .into_iter()
            .map(|c| ContactResponse {
                id: c.id,
                phone: c.phone,
                name: c.name,
                status: c.status,
                sent_at: c.sent_at,
                error_message: c.error_message,
            })
            .collect(),
    ))
}
