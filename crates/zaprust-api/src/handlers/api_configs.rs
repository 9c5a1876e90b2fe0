//! Provider API configuration handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use zaprust_storage::models::{ApiConfiguration, ApiKind, CreateApiConfiguration};
use zaprust_storage::repository::ApiConfigRepository;

use super::ErrorResponse;
use crate::state::AppState;

/// API configuration response (access token never leaves the server)
#[derive(Debug, Serialize)]
pub struct ApiConfigResponse {
    pub id: Uuid,
    pub name: String,
    pub api_kind: String,
    pub server_url: String,
    pub instance_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ApiConfiguration> for ApiConfigResponse {
    fn from(c: ApiConfiguration) -> Self {
        Self {
            id: c.id,
            name: c.name,
            api_kind: c.api_kind,
            server_url: c.server_url,
            instance_name: c.instance_name,
            is_active: c.is_active,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Request body for creating a configuration
#[derive(Debug, Deserialize)]
pub struct CreateApiConfigRequest {
    pub name: String,
    pub api_kind: String,
    pub server_url: String,
    pub instance_name: String,
    pub access_token: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Request body for rotating an access token
#[derive(Debug, Deserialize)]
pub struct RotateTokenRequest {
    pub access_token: String,
}

/// Connection test response
#[derive(Debug, Serialize)]
pub struct ConnectionTestResponse {
    pub success: bool,
    pub error: Option<String>,
}

async fn load_for_tenant(
    state: &AppState,
    tenant_id: Uuid,
    config_id: Uuid,
) -> Result<ApiConfiguration, (StatusCode, Json<ErrorResponse>)> {
    let repo = ApiConfigRepository::new(state.db_pool.pool().clone());

    let config = repo
        .get(config_id)
        .await
        .map_err(|e| {
            error!("Failed to load API configuration: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "internal_error",
                    "Failed to load API configuration",
                )),
            )
        })?
        .filter(|c| c.tenant_id == tenant_id)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new("not_found", "API configuration not found")),
            )
        })?;

    Ok(config)
}

/// List provider configurations for a tenant
///
/// GET /api/v1/tenants/:tenant_id/api-configs
pub async fn list_api_configs(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<Vec<ApiConfigResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let repo = ApiConfigRepository::new(state.db_pool.pool().clone());

    let configs = repo.list_by_tenant(tenant_id).await.map_err(|e| {
        error!("Failed to list API configurations: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "internal_error",
                "Failed to list API configurations",
            )),
        )
    })?;

    Ok(Json(
        configs.into_iter().map(ApiConfigResponse::from).collect(),
    ))
}

/// Create a provider configuration.
///
/// The access token is encrypted before it is stored.
///
/// POST /api/v1/tenants/:tenant_id/api-configs
pub async fn create_api_config(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<Uuid>,
    Json(input): Json<CreateApiConfigRequest>,
) -> Result<(StatusCode, Json<ApiConfigResponse>), (StatusCode, Json<ErrorResponse>)> {
    if input.name.is_empty() || input.server_url.is_empty() || input.access_token.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "validation_error",
                "name, server_url and access_token are required",
            )),
        ));
    }

    if input.api_kind.parse::<ApiKind>().is_err() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "validation_error",
                "Unknown api_kind",
            )),
        ));
    }

    let encrypted = state.cipher.encrypt(&input.access_token).map_err(|e| {
        error!("Failed to encrypt access token: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "internal_error",
                "Failed to encrypt access token",
            )),
        )
    })?;

    let repo = ApiConfigRepository::new(state.db_pool.pool().clone());
    let config = repo
        .create(CreateApiConfiguration {
            tenant_id,
            name: input.name,
            api_kind: input.api_kind,
            server_url: input.server_url,
            instance_name: input.instance_name,
            access_token: encrypted,
            is_active: input.is_active,
        })
        .await
        .map_err(|e| {
            error!("Failed to create API configuration: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "internal_error",
                    "Failed to create API configuration",
                )),
            )
        })?;

    info!("Created API configuration {} for tenant {}", config.id, tenant_id);

    Ok((StatusCode::CREATED, Json(ApiConfigResponse::from(config))))
}

/// Test connectivity to a provider
///
/// POST /api/v1/tenants/:tenant_id/api-configs/:config_id/test
pub async fn test_api_config(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, config_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ConnectionTestResponse>, (StatusCode, Json<ErrorResponse>)> {
    let config = load_for_tenant(&state, tenant_id, config_id).await?;

    let client = match state.provider_factory.create(config.id).await {
        Ok(client) => client,
        Err(e) => {
            return Ok(Json(ConnectionTestResponse {
                success: false,
                error: Some(e.to_string()),
            }));
        }
    };

    match client.test_connection().await {
        Ok(()) => Ok(Json(ConnectionTestResponse {
            success: true,
            error: None,
        })),
        Err(e) => Ok(Json(ConnectionTestResponse {
            success: false,
            error: Some(e.to_string()),
        })),
    }
}

/// Rotate a provider access token.
///
/// The token is encrypted before it is stored.
///
/// PUT /api/v1/tenants/:tenant_id/api-configs/:config_id/token
pub async fn rotate_token(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, config_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<RotateTokenRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    if input.access_token.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "validation_error",
                "Access token is required",
            )),
        ));
    }

    let config = load_for_tenant(&state, tenant_id, config_id).await?;

    let encrypted = state.cipher.encrypt(&input.access_token).map_err(|e| {
        error!("Failed to encrypt access token: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "internal_error",
                "Failed to encrypt access token",
            )),
        )
    })?;

    let repo = ApiConfigRepository::new(state.db_pool.pool().clone());
    repo.update_access_token(config.id, &encrypted)
        .await
        .map_err(|e| {
            error!("Failed to store access token: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "internal_error",
                    "Failed to store access token",
                )),
            )
        })?;

    info!("Rotated access token for API configuration {}", config_id);

    Ok(StatusCode::NO_CONTENT)
}
