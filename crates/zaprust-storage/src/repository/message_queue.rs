//! Message queue repository
//!
//! The queue is the only shared mutable resource between dispatch workers,
//! so every state transition here is a conditional update: claims flip
//! `pending` rows to `sending` in a single statement, and outcome writes
//! only touch the row the caller claimed.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;
use zaprust_common::types::{CampaignId, QueueTaskId};

use crate::models::{CreateQueueTask, QueueStatusCounts, QueueTask};

/// Message queue repository
#[derive(Clone)]
pub struct MessageQueueRepository {
    pool: PgPool,
}

impl MessageQueueRepository {
    /// Create a new message queue repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Atomically claim due pending tasks.
    ///
    /// Selects `pending` rows whose `scheduled_at` has passed, earliest
    /// first, and marks them `sending` in the same statement. The
    /// `FOR UPDATE SKIP LOCKED` subselect guarantees two concurrent
    /// claimers never receive the same row.
    pub async fn claim_due(&self, limit: i64) -> Result<Vec<QueueTask>, sqlx::Error> {
        sqlx::query_as::<_, QueueTask>(
            r#"
            UPDATE message_queue SET
                status = 'sending',
                claimed_at = NOW(),
                updated_at = NOW()
            WHERE id IN (
                SELECT id FROM message_queue
                WHERE status = 'pending'
                  AND scheduled_at <= NOW()
                ORDER BY scheduled_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map(|mut tasks| {
            // RETURNING does not preserve the subselect ordering
            tasks.sort_by_key(|t| t.scheduled_at);
            tasks
        })
    }

    /// Requeue tasks stuck in `sending` past the lease timeout.
    ///
    /// A worker that crashed between claiming and writing the outcome
    /// leaves its tasks stranded; this puts them back in `pending` so the
    /// next tick can pick them up.
    pub async fn requeue_stuck(&self, older_than: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE message_queue SET
                status = 'pending',
                claimed_at = NULL,
                updated_at = NOW()
            WHERE status = 'sending'
              AND claimed_at IS NOT NULL
              AND claimed_at < $1
            "#,
        )
        .bind(older_than)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Mark a task as sent
    pub async fn mark_sent(
        &self,
        id: QueueTaskId,
        provider_message_id: Option<&str>,
    ) -> Result<Option<QueueTask>, sqlx::Error> {
        sqlx::query_as::<_, QueueTask>(
            r#"
            UPDATE message_queue SET
                status = 'sent',
                provider_message_id = $2,
                sent_at = NOW(),
                claimed_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'sending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(provider_message_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Reschedule a task for retry with the given attempt count and time
    pub async fn schedule_retry(
        &self,
        id: QueueTaskId,
        retry_count: i32,
        scheduled_at: DateTime<Utc>,
        error: &str,
    ) -> Result<Option<QueueTask>, sqlx::Error> {
        sqlx::query_as::<_, QueueTask>(
            r#"
            UPDATE message_queue SET
                status = 'pending',
                retry_count = $2,
                scheduled_at = $3,
                error_message = $4,
                claimed_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'sending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(retry_count)
        .bind(scheduled_at)
        .bind(error)
        .fetch_optional(&self.pool)
        .await
    }

    /// Release a claimed task back to `pending` without counting an attempt.
    ///
    /// Used when pacing rules (daily limit, allowed hours) defer a task
    /// that was otherwise ready.
    pub async fn defer(
        &self,
        id: QueueTaskId,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Option<QueueTask>, sqlx::Error> {
        sqlx::query_as::<_, QueueTask>(
            r#"
            UPDATE message_queue SET
                status = 'pending',
                scheduled_at = $2,
                claimed_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'sending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(scheduled_at)
        .fetch_optional(&self.pool)
        .await
    }

    /// Mark a task as permanently failed
    pub async fn mark_failed(
        &self,
        id: QueueTaskId,
        retry_count: i32,
        error: &str,
    ) -> Result<Option<QueueTask>, sqlx::Error> {
        sqlx::query_as::<_, QueueTask>(
            r#"
            UPDATE message_queue SET
                status = 'failed',
                retry_count = $2,
                error_message = $3,
                claimed_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'sending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(retry_count)
        .bind(error)
        .fetch_optional(&self.pool)
        .await
    }

    /// Cancel all pending tasks for a campaign
    pub async fn cancel_by_campaign(&self, campaign_id: CampaignId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE message_queue SET
                status = 'cancelled',
                updated_at = NOW()
            WHERE campaign_id = $1 AND status = 'pending'
            "#,
        )
        .bind(campaign_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Create queued tasks in batch
    pub async fn create_batch(&self, tasks: Vec<CreateQueueTask>) -> Result<u64, sqlx::Error> {
        let mut count = 0u64;
        let mut tx = self.pool.begin().await?;

        for input in tasks {
            let result = sqlx::query(
                r#"
                INSERT INTO message_queue (
                    id, campaign_id, contact_id, contact_phone, contact_name,
                    message_content, media_url, media_type, scheduled_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(input.campaign_id)
            .bind(input.contact_id)
            .bind(&input.contact_phone)
            .bind(&input.contact_name)
            .bind(&input.message_content)
            .bind(&input.media_url)
            .bind(&input.media_type)
            .bind(input.scheduled_at)
            .execute(&mut *tx)
            .await?;

            count += result.rows_affected();
        }

        tx.commit().await?;
        Ok(count)
    }

    /// List tasks for a campaign
    pub async fn list_by_campaign(
        &self,
        campaign_id: CampaignId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<QueueTask>, sqlx::Error> {
        sqlx::query_as::<_, QueueTask>(
            r#"
            SELECT * FROM message_queue
            WHERE campaign_id = $1
            ORDER BY scheduled_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(campaign_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// Count tasks sent for a campaign since the given instant.
    ///
    /// Backs the daily send limit; the caller passes the UTC day start.
    pub async fn count_sent_since(
        &self,
        campaign_id: CampaignId,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM message_queue
            WHERE campaign_id = $1 AND status = 'sent' AND sent_at >= $2
            "#,
        )
        .bind(campaign_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    /// Get queue-wide status counts
    pub async fn status_counts(&self) -> Result<QueueStatusCounts, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'pending') as pending,
                COUNT(*) FILTER (WHERE status = 'sending') as sending,
                COUNT(*) FILTER (WHERE status = 'sent') as sent,
                COUNT(*) FILTER (WHERE status = 'failed') as failed,
                COUNT(*) FILTER (WHERE status = 'cancelled') as cancelled
            FROM message_queue
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(QueueStatusCounts {
            pending: row.get::<Option<i64>, _>("pending").unwrap_or(0),
            sending: row.get::<Option<i64>, _>("sending").unwrap_or(0),
            sent: row.get::<Option<i64>, _>("sent").unwrap_or(0),
            failed: row.get::<Option<i64>, _>("failed").unwrap_or(0),
            cancelled: row.get::<Option<i64>, _>("cancelled").unwrap_or(0),
        })
    }
}
