//! Queue processor - drains the message queue through provider clients
//!
//! One tick claims due tasks, enforces per-campaign pacing, renders and
//! sends each message, applies the retry policy, and feeds terminal
//! outcomes into campaign progress aggregation. Tasks within a tick are
//! processed strictly sequentially; the inter-message sleep is the
//! anti-spam throttle.

use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{interval, Duration as TokioDuration};
use tracing::{debug, error, info, warn};
use zaprust_common::config::DispatchConfig;
use zaprust_common::types::{CampaignId, MediaKind};
use zaprust_storage::db::DatabasePool;
use zaprust_storage::models::{Campaign, QueueTask, SendingConfiguration};
use zaprust_storage::repository::{
    CampaignRepository, ContactRepository, MessageQueueRepository, SendingConfigRepository,
};

use super::manager::CampaignManager;
use super::pacing;
use super::progress::ProgressTracker;
use super::template::TemplateRenderer;
use crate::provider::{ProviderFactory, SendOutcome};

/// How one claimed task was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskResolution {
    Sent,
    Retried,
    Failed,
    Deferred,
}

/// Summary of one dispatch tick
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickSummary {
    pub skipped: bool,
    pub claimed: usize,
    pub sent: usize,
    pub retried: usize,
    pub failed: usize,
    pub deferred: usize,
    pub requeued_stuck: u64,
}

impl TickSummary {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }
}

/// Background processor for the message queue
pub struct QueueProcessor {
    queue_repo: MessageQueueRepository,
    campaign_repo: CampaignRepository,
    contact_repo: ContactRepository,
    sending_config_repo: SendingConfigRepository,
    progress: ProgressTracker,
    provider_factory: ProviderFactory,
    campaign_manager: Arc<CampaignManager>,
    config: DispatchConfig,
    /// In-process re-entrancy guard: at most one tick runs at a time
    busy: AtomicBool,
    /// Gate for the periodic ticker; manual ticks ignore it
    running: AtomicBool,
}

impl QueueProcessor {
    /// Create a new queue processor
    pub fn new(
        db_pool: DatabasePool,
        provider_factory: ProviderFactory,
        campaign_manager: Arc<CampaignManager>,
        config: DispatchConfig,
    ) -> Self {
        let pool = db_pool.pool().clone();
        let campaign_repo = CampaignRepository::new(pool.clone());
        let contact_repo = ContactRepository::new(pool.clone());

        Self {
            queue_repo: MessageQueueRepository::new(pool.clone()),
            campaign_repo: campaign_repo.clone(),
            contact_repo: contact_repo.clone(),
            sending_config_repo: SendingConfigRepository::new(pool),
            progress: ProgressTracker::new(campaign_repo, contact_repo),
            provider_factory,
            campaign_manager,
            busy: AtomicBool::new(false),
            running: AtomicBool::new(config.autostart),
            config,
        }
    }

    /// Enable the periodic ticker
    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        info!("Queue processor started");
    }

    /// Disable the periodic ticker.
    ///
    /// A tick already in flight finishes its current task batch; only new
    /// ticks are prevented.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("Queue processor stopped");
    }

    /// Whether the periodic ticker is enabled
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run the polling loop. Intended to be spawned once by the entry point.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = interval(TokioDuration::from_secs(self.config.poll_interval_secs));

        info!(
            interval_secs = self.config.poll_interval_secs,
            batch_size = self.config.batch_size,
            "Queue processor loop started"
        );

        loop {
            ticker.tick().await;

            if !self.is_running() {
                continue;
            }

            if let Err(e) = self.process_tick().await {
                error!("Error processing message queue: {}", e);
            }
        }
    }

    /// Execute one dispatch tick.
    ///
    /// Callable from the periodic loop or from the manual trigger API. If
    /// another tick is already executing in this process, the call is a
    /// no-op (no queueing of ticks).
    pub async fn process_tick(&self) -> anyhow::Result<TickSummary> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Tick already in progress, skipping");
            return Ok(TickSummary::skipped());
        }

        let result = self.run_tick().await;
        self.busy.store(false, Ordering::SeqCst);
        result
    }

    async fn run_tick(&self) -> anyhow::Result<TickSummary> {
        let mut summary = TickSummary::default();

        // Recover tasks stranded in `sending` by a crashed worker
        let lease_cutoff = Utc::now() - Duration::seconds(self.config.lease_timeout_secs);
        summary.requeued_stuck = self.queue_repo.requeue_stuck(lease_cutoff).await?;
        if summary.requeued_stuck > 0 {
            warn!(
                count = summary.requeued_stuck,
                "Requeued tasks stuck in sending state"
            );
        }

        // Promote scheduled campaigns whose start time has passed
        if let Err(e) = self.campaign_manager.start_due_campaigns().await {
            error!("Error starting scheduled campaigns: {}", e);
        }

        // Claim due work; the claim itself marks rows `sending`
        let tasks = self.queue_repo.claim_due(self.config.batch_size).await?;
        if tasks.is_empty() {
            return Ok(summary);
        }
        summary.claimed = tasks.len();

        debug!(count = tasks.len(), "Claimed due tasks");

        // One pacing-config and campaign lookup per distinct campaign
        let mut campaign_ids: Vec<CampaignId> = tasks.iter().map(|t| t.campaign_id).collect();
        campaign_ids.sort();
        campaign_ids.dedup();

        let configs = self
            .sending_config_repo
            .get_for_campaigns(&campaign_ids)
            .await?;

        let mut campaigns: HashMap<CampaignId, Campaign> = HashMap::new();
        for id in &campaign_ids {
            if let Some(campaign) = self.campaign_repo.get(*id).await? {
                campaigns.insert(*id, campaign);
            }
        }

        // Consecutive deliveries per campaign, for pause-after-N
        let mut sends_in_row: HashMap<CampaignId, i32> = HashMap::new();

        for task in tasks {
            let config = configs
                .get(&task.campaign_id)
                .cloned()
                .unwrap_or_else(|| SendingConfiguration::defaults_for(task.campaign_id));

            let resolution = match self
                .process_task(&task, &config, campaigns.get(&task.campaign_id))
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    // Store errors abort the rest of the batch; the lease
                    // reaper recovers anything left in `sending`
                    error!(task_id = %task.id, "Store error while processing task: {}", e);
                    return Err(e);
                }
            };

            match resolution {
                TaskResolution::Sent => summary.sent += 1,
                TaskResolution::Retried => summary.retried += 1,
                TaskResolution::Failed => summary.failed += 1,
                TaskResolution::Deferred => summary.deferred += 1,
            }

            if resolution == TaskResolution::Deferred {
                // Deferral was not an attempt; no pacing sleep
                continue;
            }

            if resolution == TaskResolution::Sent && config.pause_after_messages > 0 {
                let count = sends_in_row.entry(task.campaign_id).or_insert(0);
                *count += 1;
                if *count >= config.pause_after_messages {
                    *count = 0;
                    let pause = config.pause_duration_seconds.max(0) as u64;
                    if pause > 0 {
                        debug!(
                            campaign_id = %task.campaign_id,
                            pause_secs = pause,
                            "Pausing after consecutive sends"
                        );
                        tokio::time::sleep(TokioDuration::from_secs(pause)).await;
                    }
                }
            }

            let delay = pacing::inter_message_delay(&config);
            if !delay.is_zero() {
                debug!(delay_ms = delay.as_millis() as u64, "Inter-message delay");
                tokio::time::sleep(delay).await;
            }
        }

        info!(
            claimed = summary.claimed,
            sent = summary.sent,
            retried = summary.retried,
            failed = summary.failed,
            deferred = summary.deferred,
            "Dispatch tick finished"
        );

        Ok(summary)
    }

    /// Process one claimed task through to a state transition.
    ///
    /// Returns `Err` only for store failures; provider and configuration
    /// failures are converted into task state.
    async fn process_task(
        &self,
        task: &QueueTask,
        config: &SendingConfiguration,
        campaign: Option<&Campaign>,
    ) -> anyhow::Result<TaskResolution> {
        debug!(task_id = %task.id, phone = %task.contact_phone, "Processing task");

        let now = Utc::now();

        // Pacing windows: deferral puts the task back without an attempt
        if !pacing::within_allowed_hours(config, now) {
            let next = pacing::next_window_start(config, now);
            debug!(task_id = %task.id, until = %next, "Outside allowed hours, deferring");
            self.queue_repo.defer(task.id, next).await?;
            return Ok(TaskResolution::Deferred);
        }

        if let Some(limit) = config.daily_limit {
            let sent_today = self
                .queue_repo
                .count_sent_since(task.campaign_id, pacing::utc_day_start(now))
                .await?;
            if sent_today >= limit as i64 {
                let next = pacing::next_utc_midnight(now);
                debug!(
                    task_id = %task.id,
                    sent_today,
                    limit,
                    "Daily limit reached, deferring to next day"
                );
                self.queue_repo.defer(task.id, next).await?;
                return Ok(TaskResolution::Deferred);
            }
        }

        let outcome = match campaign {
            Some(campaign) => self.attempt_send(task, campaign).await,
            None => SendOutcome::PermanentFailure {
                error: "Campaign no longer exists".to_string(),
            },
        };

        self.handle_outcome(task, config, outcome).await
    }

    /// Build the provider client, render the message, and dispatch it
    async fn attempt_send(&self, task: &QueueTask, campaign: &Campaign) -> SendOutcome {
        let client = match self.provider_factory.create(campaign.api_config_id).await {
            Ok(client) => client,
            Err(e) => {
                warn!(task_id = %task.id, "Failed to create API instance: {}", e);
                // Configuration failures follow the normal retry policy;
                // an operator fixing the config should un-stick the queue
                return SendOutcome::TemporaryFailure {
                    error: format!("Failed to create API instance: {}", e),
                };
            }
        };

        let attributes = match self.contact_repo.get(task.contact_id).await {
            Ok(contact) => contact.map(|c| c.attributes),
            Err(e) => {
                warn!(task_id = %task.id, "Failed to load contact attributes: {}", e);
                None
            }
        };

        let variables = TemplateRenderer::task_variables(task, attributes.as_ref());
        let body = TemplateRenderer::render(&task.message_content, &variables);

        match (&task.media_url, &task.media_type) {
            (Some(media_url), Some(media_type)) => match media_type.parse::<MediaKind>() {
                Ok(kind) => {
                    client
                        .send_media(&task.contact_phone, &body, media_url, kind)
                        .await
                }
                Err(e) => SendOutcome::PermanentFailure { error: e },
            },
            _ => client.send_text(&task.contact_phone, &body).await,
        }
    }

    /// Apply the retry policy and persist the outcome
    async fn handle_outcome(
        &self,
        task: &QueueTask,
        config: &SendingConfiguration,
        outcome: SendOutcome,
    ) -> anyhow::Result<TaskResolution> {
        match outcome {
            SendOutcome::Sent {
                provider_message_id,
            } => {
                self.queue_repo
                    .mark_sent(task.id, provider_message_id.as_deref())
                    .await?;
                self.contact_repo.mark_sent(task.contact_id).await?;

                info!(task_id = %task.id, phone = %task.contact_phone, "Message sent");

                if let Err(e) = self.progress.recompute(task.campaign_id).await {
                    error!(campaign_id = %task.campaign_id, "Progress update failed: {}", e);
                }
                Ok(TaskResolution::Sent)
            }

            SendOutcome::TemporaryFailure { error } => {
                let retry_count = task.retry_count + 1;

                if should_retry(retry_count, config.max_retries) {
                    let scheduled_at = Utc::now() + pacing::backoff_delay(retry_count);
                    self.queue_repo
                        .schedule_retry(task.id, retry_count, scheduled_at, &error)
                        .await?;

                    info!(
                        task_id = %task.id,
                        retry = retry_count,
                        max_retries = config.max_retries,
                        at = %scheduled_at,
                        "Scheduled retry"
                    );
                    Ok(TaskResolution::Retried)
                } else {
                    self.fail_task(task, retry_count, &error).await?;
                    Ok(TaskResolution::Failed)
                }
            }

            SendOutcome::PermanentFailure { error } => {
                // Not worth retrying; fail on the spot
                self.fail_task(task, task.retry_count + 1, &error).await?;
                Ok(TaskResolution::Failed)
            }
        }
    }

    /// Terminally fail a task and propagate to contact and campaign
    async fn fail_task(&self, task: &QueueTask, retry_count: i32, error: &str) -> anyhow::Result<()> {
        self.queue_repo
            .mark_failed(task.id, retry_count, error)
            .await?;
        self.contact_repo.mark_failed(task.contact_id, error).await?;

        warn!(
            task_id = %task.id,
            phone = %task.contact_phone,
            "Message failed permanently: {}",
            error
        );

        if let Err(e) = self.progress.recompute(task.campaign_id).await {
            error!(campaign_id = %task.campaign_id, "Progress update failed: {}", e);
        }
        Ok(())
    }

    /// Queue-wide status counts for the stats endpoint
    pub async fn queue_stats(&self) -> anyhow::Result<zaprust_storage::models::QueueStatusCounts> {
        Ok(self.queue_repo.status_counts().await?)
    }
}

/// Whether a temporary failure at attempt `retry_count` is rescheduled.
///
/// Once the count exceeds the campaign's `max_retries` the task fails
/// terminally and never returns to `pending`.
fn should_retry(retry_count: i32, max_retries: i32) -> bool {
    retry_count <= max_retries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_retry_within_max_retries() {
        // max_retries = 3: attempts 1..=3 retry, attempt 4 fails terminally
        assert!(should_retry(1, 3));
        assert!(should_retry(2, 3));
        assert!(should_retry(3, 3));
        assert!(!should_retry(4, 3));
    }

    #[test]
    fn test_should_retry_zero_max_retries() {
        assert!(!should_retry(1, 0));
    }

    #[test]
    fn test_retry_backoff_schedule() {
        // Retries 1, 2, 3 land 2, 4, 8 minutes out
        for (attempt, minutes) in [(1, 2), (2, 4), (3, 8)] {
            assert_eq!(pacing::backoff_delay(attempt), Duration::minutes(minutes));
        }
    }
}
