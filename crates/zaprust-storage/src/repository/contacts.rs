//! Campaign contact repository

use sqlx::{PgPool, Row};
use uuid::Uuid;
use zaprust_common::types::{CampaignId, ContactId};

use crate::models::{CampaignContact, ContactStatusCounts, CreateContact};

/// Campaign contact repository
#[derive(Clone)]
pub struct ContactRepository {
    pool: PgPool,
}

impl ContactRepository {
    /// Create a new contact repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create contacts in batch
    pub async fn create_batch(&self, contacts: Vec<CreateContact>) -> Result<u64, sqlx::Error> {
        let mut count = 0u64;
        let mut tx = self.pool.begin().await?;

        for input in contacts {
            let attributes = input.attributes.unwrap_or_else(|| serde_json::json!({}));

            let result = sqlx::query(
                r#"
                INSERT INTO campaign_contacts (id, campaign_id, phone, name, attributes)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(input.campaign_id)
            .bind(&input.phone)
            .bind(&input.name)
            .bind(&attributes)
            .execute(&mut *tx)
            .await?;

            count += result.rows_affected();
        }

        tx.commit().await?;
        Ok(count)
    }

    /// Get a contact by ID
    pub async fn get(&self, id: ContactId) -> Result<Option<CampaignContact>, sqlx::Error> {
        sqlx::query_as::<_, CampaignContact>("SELECT * FROM campaign_contacts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List contacts for a campaign
    pub async fn list_by_campaign(
        &self,
        campaign_id: CampaignId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CampaignContact>, sqlx::Error> {
        sqlx::query_as::<_, CampaignContact>(
            r#"
            SELECT * FROM campaign_contacts
            WHERE campaign_id = $1
            ORDER BY created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(campaign_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// List contacts for a campaign still awaiting delivery
    pub async fn list_pending_by_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<CampaignContact>, sqlx::Error> {
        sqlx::query_as::<_, CampaignContact>(
            r#"
            SELECT * FROM campaign_contacts
            WHERE campaign_id = $1 AND status = 'pending'
            ORDER BY created_at ASC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Mark a contact's message as sent
    pub async fn mark_sent(&self, id: ContactId) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE campaign_contacts SET
                status = 'sent',
                sent_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark a contact's message as failed
    pub async fn mark_failed(&self, id: ContactId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE campaign_contacts SET
                status = 'failed',
                error_message = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get contact status counts for a campaign
    pub async fn status_counts(
        &self,
        campaign_id: CampaignId,
    ) -> Result<ContactStatusCounts, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) as total,
                COUNT(*) FILTER (WHERE status = 'sent') as sent,
                COUNT(*) FILTER (WHERE status = 'failed') as failed
            FROM campaign_contacts
            WHERE campaign_id = $1
            "#,
        )
        .bind(campaign_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ContactStatusCounts {
            total: row.get::<Option<i64>, _>("total").unwrap_or(0),
            sent: row.get::<Option<i64>, _>("sent").unwrap_or(0),
            failed: row.get::<Option<i64>, _>("failed").unwrap_or(0),
        })
    }

    /// Count contacts for a campaign
    pub async fn count_by_campaign(&self, campaign_id: CampaignId) -> Result<i64, sqlx::Error> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM campaign_contacts WHERE campaign_id = $1")
                .bind(campaign_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0)
    }
}
