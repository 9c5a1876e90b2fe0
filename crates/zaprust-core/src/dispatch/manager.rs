//! Campaign manager - lifecycle transitions and queue fan-out

use anyhow::Result;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};
use zaprust_common::types::{CampaignId, TenantId};
use zaprust_storage::db::DatabasePool;
use zaprust_storage::models::{
    Campaign, CampaignStatus, ContactStatusCounts, CreateQueueTask, QueueStatusCounts,
};
use zaprust_storage::repository::{
    CampaignRepository, ContactRepository, MessageQueueRepository,
};

use super::progress::ProgressTracker;

/// Campaign manager errors
#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Campaign not found")]
    NotFound,

    #[error("Campaign is not in draft or scheduled status")]
    NotStartable,

    #[error("Campaign is not running")]
    NotRunning,

    #[error("Campaign is not paused")]
    NotPaused,

    #[error("Campaign is not cancellable")]
    NotCancellable,

    #[error("Campaign has no contacts")]
    NoContacts,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Per-campaign statistics for the API
#[derive(Debug, Clone, serde::Serialize)]
pub struct CampaignStats {
    pub campaign_id: CampaignId,
    pub status: String,
    pub total_contacts: i64,
    pub sent: i64,
    pub failed: i64,
    pub pending: i64,
    pub queue: QueueStatusCounts,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Campaign Manager - owns campaign lifecycle transitions
pub struct CampaignManager {
    campaign_repo: CampaignRepository,
    contact_repo: ContactRepository,
    queue_repo: MessageQueueRepository,
    progress: ProgressTracker,
}

impl CampaignManager {
    /// Create a new campaign manager
    pub fn new(db_pool: DatabasePool) -> Self {
        let pool = db_pool.pool().clone();
        let campaign_repo = CampaignRepository::new(pool.clone());
        let contact_repo = ContactRepository::new(pool.clone());

        Self {
            campaign_repo: campaign_repo.clone(),
            contact_repo: contact_repo.clone(),
            queue_repo: MessageQueueRepository::new(pool),
            progress: ProgressTracker::new(campaign_repo, contact_repo),
        }
    }

    /// Start a draft or scheduled campaign immediately.
    ///
    /// Fans out one queue task per pending contact and moves the campaign
    /// to `running`.
    pub async fn start_campaign(
        &self,
        tenant_id: TenantId,
        campaign_id: CampaignId,
    ) -> Result<Campaign, CampaignError> {
        let campaign = self
            .campaign_repo
            .get_by_tenant(tenant_id, campaign_id)
            .await?
            .ok_or(CampaignError::NotFound)?;

        if !matches!(
            campaign.status_enum(),
            Some(CampaignStatus::Draft) | Some(CampaignStatus::Scheduled)
        ) {
            return Err(CampaignError::NotStartable);
        }

        let queued = self.fan_out(&campaign).await?;
        if queued == 0 {
            return Err(CampaignError::NoContacts);
        }

        let updated = self
            .campaign_repo
            .update_status(campaign_id, CampaignStatus::Running)
            .await?
            .ok_or(CampaignError::NotFound)?;

        info!(
            campaign_id = %campaign_id,
            queued,
            "Campaign started"
        );

        Ok(updated)
    }

    /// Schedule a draft campaign for a later start
    pub async fn schedule_campaign(
        &self,
        tenant_id: TenantId,
        campaign_id: CampaignId,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Campaign, CampaignError> {
        let campaign = self
            .campaign_repo
            .get_by_tenant(tenant_id, campaign_id)
            .await?
            .ok_or(CampaignError::NotFound)?;

        if campaign.status_enum() != Some(CampaignStatus::Draft) {
            return Err(CampaignError::NotStartable);
        }

        let contacts = self.contact_repo.count_by_campaign(campaign_id).await?;
        if contacts == 0 {
            return Err(CampaignError::NoContacts);
        }

        sqlx::query(
            "UPDATE campaigns SET status = 'scheduled', scheduled_at = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(campaign_id)
        .bind(scheduled_at)
        .execute(self.queue_repo.pool())
        .await?;

        let updated = self
            .campaign_repo
            .get(campaign_id)
            .await?
            .ok_or(CampaignError::NotFound)?;

        info!(
            campaign_id = %campaign_id,
            at = %scheduled_at,
            "Campaign scheduled"
        );

        Ok(updated)
    }

    /// Start scheduled campaigns whose start time has passed.
    ///
    /// Called from the dispatch tick.
    pub async fn start_due_campaigns(&self) -> Result<usize> {
        let campaigns = self.campaign_repo.get_scheduled_ready().await?;
        let mut started = 0usize;

        for campaign in campaigns {
            match self.fan_out(&campaign).await {
                Ok(0) => {
                    warn!(
                        campaign_id = %campaign.id,
                        "Scheduled campaign has no contacts, marking completed"
                    );
                    self.campaign_repo
                        .update_status(campaign.id, CampaignStatus::Completed)
                        .await?;
                }
                Ok(queued) => {
                    self.campaign_repo
                        .update_status(campaign.id, CampaignStatus::Running)
                        .await?;
                    info!(campaign_id = %campaign.id, queued, "Scheduled campaign started");
                    started += 1;
                }
                Err(e) => {
                    warn!(campaign_id = %campaign.id, "Failed to start scheduled campaign: {}", e);
                }
            }
        }

        Ok(started)
    }

    /// Pause a running campaign.
    ///
    /// Pending tasks are cancelled; a task already being sent runs to
    /// completion.
    pub async fn pause_campaign(
        &self,
        tenant_id: TenantId,
        campaign_id: CampaignId,
    ) -> Result<Campaign, CampaignError> {
        let campaign = self
            .campaign_repo
            .get_by_tenant(tenant_id, campaign_id)
            .await?
            .ok_or(CampaignError::NotFound)?;

        if campaign.status_enum() != Some(CampaignStatus::Running) {
            return Err(CampaignError::NotRunning);
        }

        let cancelled = self.queue_repo.cancel_by_campaign(campaign_id).await?;

        let updated = self
            .campaign_repo
            .update_status(campaign_id, CampaignStatus::Paused)
            .await?
            .ok_or(CampaignError::NotFound)?;

        info!(
            campaign_id = %campaign_id,
            cancelled_tasks = cancelled,
            "Campaign paused"
        );

        Ok(updated)
    }

    /// Resume a paused campaign.
    ///
    /// Re-inserts queue tasks for contacts still pending.
    pub async fn resume_campaign(
        &self,
        tenant_id: TenantId,
        campaign_id: CampaignId,
    ) -> Result<Campaign, CampaignError> {
        let campaign = self
            .campaign_repo
            .get_by_tenant(tenant_id, campaign_id)
            .await?
            .ok_or(CampaignError::NotFound)?;

        if campaign.status_enum() != Some(CampaignStatus::Paused) {
            return Err(CampaignError::NotPaused);
        }

        let queued = self.fan_out(&campaign).await?;

        let updated = self
            .campaign_repo
            .update_status(campaign_id, CampaignStatus::Running)
            .await?
            .ok_or(CampaignError::NotFound)?;

        info!(campaign_id = %campaign_id, queued, "Campaign resumed");

        if queued == 0 {
            // Nothing left to send; derive the terminal state right away
            self.progress.recompute(campaign_id).await?;
            return Ok(self
                .campaign_repo
                .get(campaign_id)
                .await?
                .ok_or(CampaignError::NotFound)?);
        }

        Ok(updated)
    }

    /// Cancel a scheduled, running, or paused campaign
    pub async fn cancel_campaign(
        &self,
        tenant_id: TenantId,
        campaign_id: CampaignId,
    ) -> Result<Campaign, CampaignError> {
        let campaign = self
            .campaign_repo
            .get_by_tenant(tenant_id, campaign_id)
            .await?
            .ok_or(CampaignError::NotFound)?;

        if !matches!(
            campaign.status_enum(),
            Some(CampaignStatus::Scheduled)
                | Some(CampaignStatus::Running)
                | Some(CampaignStatus::Paused)
        ) {
            return Err(CampaignError::NotCancellable);
        }

        let cancelled = self.queue_repo.cancel_by_campaign(campaign_id).await?;

        let updated = self
            .campaign_repo
            .update_status(campaign_id, CampaignStatus::Cancelled)
            .await?
            .ok_or(CampaignError::NotFound)?;

        info!(
            campaign_id = %campaign_id,
            cancelled_tasks = cancelled,
            "Campaign cancelled"
        );

        Ok(updated)
    }

    /// Get campaign statistics
    pub async fn campaign_stats(
        &self,
        tenant_id: TenantId,
        campaign_id: CampaignId,
    ) -> Result<CampaignStats, CampaignError> {
        let campaign = self
            .campaign_repo
            .get_by_tenant(tenant_id, campaign_id)
            .await?
            .ok_or(CampaignError::NotFound)?;

        let counts: ContactStatusCounts = self.contact_repo.status_counts(campaign_id).await?;
        let queue = self.queue_counts_for(campaign_id).await?;

        Ok(CampaignStats {
            campaign_id,
            status: campaign.status,
            total_contacts: counts.total,
            sent: counts.sent,
            failed: counts.failed,
            pending: counts.pending(),
            queue,
            started_at: campaign.started_at,
            completed_at: campaign.completed_at,
        })
    }

    /// Insert one queue task per pending contact of the campaign
    async fn fan_out(&self, campaign: &Campaign) -> Result<u64, CampaignError> {
        let contacts = self
            .contact_repo
            .list_pending_by_campaign(campaign.id)
            .await?;

        if contacts.is_empty() {
            return Ok(0);
        }

        let total = self.contact_repo.count_by_campaign(campaign.id).await?;
        self.campaign_repo
            .set_total_contacts(campaign.id, total as i32)
            .await?;

        let now = Utc::now();
        let tasks: Vec<CreateQueueTask> = contacts
            .into_iter()
            .map(|contact| CreateQueueTask {
                campaign_id: campaign.id,
                contact_id: contact.id,
                contact_phone: contact.phone,
                contact_name: contact.name,
                message_content: campaign.message_content.clone(),
                media_url: campaign.media_url.clone(),
                media_type: campaign.media_type.clone(),
                scheduled_at: now,
            })
            .collect();

        let queued = self.queue_repo.create_batch(tasks).await?;
        Ok(queued)
    }

    /// Queue status counts restricted to one campaign
    async fn queue_counts_for(&self, campaign_id: CampaignId) -> Result<QueueStatusCounts, sqlx::Error> {
        use sqlx::Row;

        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'pending') as pending,
                COUNT(*) FILTER (WHERE status = 'sending') as sending,
                COUNT(*) FILTER (WHERE status = 'sent') as sent,
                COUNT(*) FILTER (WHERE status = 'failed') as failed,
                COUNT(*) FILTER (WHERE status = 'cancelled') as cancelled
            FROM message_queue
            WHERE campaign_id = $1
            "#,
        )
        .bind(campaign_id)
        .fetch_one(self.queue_repo.pool())
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
