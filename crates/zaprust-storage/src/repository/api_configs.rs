//! Provider API configuration repository

use sqlx::PgPool;
use uuid::Uuid;
use zaprust_common::types::{ApiConfigId, TenantId};

use crate::models::{ApiConfiguration, CreateApiConfiguration};

/// Provider API configuration repository
#[derive(Clone)]
pub struct ApiConfigRepository {
    pool: PgPool,
}

impl ApiConfigRepository {
    /// Create a new API configuration repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new configuration.
    ///
    /// The caller is responsible for encrypting `access_token` first.
    pub async fn create(
        &self,
        input: CreateApiConfiguration,
    ) -> Result<ApiConfiguration, sqlx::Error> {
        sqlx::query_as::<_, ApiConfiguration>(
            r#"
            INSERT INTO api_configurations (
                id, tenant_id, name, api_kind, server_url, instance_name,
                access_token, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.tenant_id)
        .bind(&input.name)
        .bind(&input.api_kind)
        .bind(&input.server_url)
        .bind(&input.instance_name)
        .bind(&input.access_token)
        .bind(input.is_active)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a configuration by ID
    pub async fn get(&self, id: ApiConfigId) -> Result<Option<ApiConfiguration>, sqlx::Error> {
        sqlx::query_as::<_, ApiConfiguration>("SELECT * FROM api_configurations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List configurations for a tenant
    pub async fn list_by_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<ApiConfiguration>, sqlx::Error> {
        sqlx::query_as::<_, ApiConfiguration>(
            r#"
            SELECT * FROM api_configurations
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Update the stored (encrypted) access token
    pub async fn update_access_token(
        &self,
        id: ApiConfigId,
        access_token: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE api_configurations SET
                access_token = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(access_token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
