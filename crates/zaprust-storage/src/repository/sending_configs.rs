//! Per-campaign pacing configuration repository

use sqlx::PgPool;
use std::collections::HashMap;
use zaprust_common::types::CampaignId;

use crate::models::SendingConfiguration;

/// Sending configuration repository
#[derive(Clone)]
pub struct SendingConfigRepository {
    pool: PgPool,
}

impl SendingConfigRepository {
    /// Create a new sending configuration repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the pacing configuration for a campaign
    pub async fn get_by_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<SendingConfiguration>, sqlx::Error> {
        sqlx::query_as::<_, SendingConfiguration>(
            "SELECT * FROM sending_configurations WHERE campaign_id = $1",
        )
        .bind(campaign_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Batch-load pacing configurations for a set of campaigns.
    ///
    /// Campaigns without a stored configuration fall back to
    /// `SendingConfiguration::defaults_for`.
    pub async fn get_for_campaigns(
        &self,
        campaign_ids: &[CampaignId],
    ) -> Result<HashMap<CampaignId, SendingConfiguration>, sqlx::Error> {
        let rows = sqlx::query_as::<_, SendingConfiguration>(
            "SELECT * FROM sending_configurations WHERE campaign_id = ANY($1)",
        )
        .bind(campaign_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut configs: HashMap<CampaignId, SendingConfiguration> =
            rows.into_iter().map(|c| (c.campaign_id, c)).collect();

        for id in campaign_ids {
            configs
                .entry(*id)
                .or_insert_with(|| SendingConfiguration::defaults_for(*id));
        }

        Ok(configs)
    }

    /// Insert or replace a campaign's pacing configuration
    pub async fn upsert(&self, config: &SendingConfiguration) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO sending_configurations (
                campaign_id, min_delay_seconds, max_delay_seconds,
                pause_after_messages, pause_duration_seconds, max_retries,
                daily_limit, allowed_hours_start, allowed_hours_end
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (campaign_id)
            DO UPDATE SET
                min_delay_seconds = EXCLUDED.min_delay_seconds,
                max_delay_seconds = EXCLUDED.max_delay_seconds,
                pause_after_messages = EXCLUDED.pause_after_messages,
                pause_duration_seconds = EXCLUDED.pause_duration_seconds,
                max_retries = EXCLUDED.max_retries,
                daily_limit = EXCLUDED.daily_limit,
                allowed_hours_start = EXCLUDED.allowed_hours_start,
                allowed_hours_end = EXCLUDED.allowed_hours_end,
                updated_at = NOW()
            "#,
        )
        .bind(config.campaign_id)
        .bind(config.min_delay_seconds)
        .bind(config.max_delay_seconds)
        .bind(config.pause_after_messages)
        .bind(config.pause_duration_seconds)
        .bind(config.max_retries)
        .bind(config.daily_limit)
        .bind(config.allowed_hours_start)
        .bind(config.allowed_hours_end)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
