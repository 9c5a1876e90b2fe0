//! Campaign progress aggregation
//!
//! Recomputes a campaign's sent/failed tally from its contacts and derives
//! the campaign lifecycle state after each terminal task resolution.

use anyhow::Result;
use tracing::{info, warn};
use zaprust_common::types::CampaignId;
use zaprust_storage::models::{CampaignStatus, ContactStatusCounts};
use zaprust_storage::repository::{CampaignRepository, ContactRepository};

/// Derive a running campaign's status from its contact counts.
///
/// Any contact that is neither sent nor failed counts as still pending,
/// keeping the campaign running.
pub fn derive_status(counts: &ContactStatusCounts) -> CampaignStatus {
    if counts.pending() > 0 {
        CampaignStatus::Running
    } else if counts.total > 0 && counts.failed == counts.total {
        CampaignStatus::Failed
    } else {
        CampaignStatus::Completed
    }
}

/// Recomputes and persists campaign progress
#[derive(Clone)]
pub struct ProgressTracker {
    campaign_repo: CampaignRepository,
    contact_repo: ContactRepository,
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new(campaign_repo: CampaignRepository, contact_repo: ContactRepository) -> Self {
        Self {
            campaign_repo,
            contact_repo,
        }
    }

    /// Recompute a campaign's progress after a terminal task resolution.
    ///
    /// Counters are always refreshed. The derived status is only written
    /// while the campaign is `running`; a task resolving after a pause or
    /// cancellation must not flip the campaign back.
    pub async fn recompute(&self, campaign_id: CampaignId) -> Result<CampaignStatus> {
        let counts = self.contact_repo.status_counts(campaign_id).await?;
        let derived = derive_status(&counts);

        let campaign = self.campaign_repo.get(campaign_id).await?;
        let current = campaign.as_ref().and_then(|c| c.status_enum());

        let status_update = match current {
            Some(CampaignStatus::Running) => Some(derived),
            Some(_) => None,
            None => {
                warn!(campaign_id = %campaign_id, "Progress update for unknown campaign");
                None
            }
        };

        self.campaign_repo
            .update_progress(
                campaign_id,
                counts.sent as i32,
                counts.failed as i32,
                status_update,
            )
            .await?;

        if let Some(status) = status_update {
            if status != CampaignStatus::Running {
                info!(
                    campaign_id = %campaign_id,
                    sent = counts.sent,
                    failed = counts.failed,
                    status = %status,
                    "Campaign finished"
                );
            }
        }

        Ok(derived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(total: i64, sent: i64, failed: i64) -> ContactStatusCounts {
        ContactStatusCounts {
            total,
            sent,
            failed,
        }
    }

    #[test]
    fn test_derive_running_while_pending_remain() {
        assert_eq!(derive_status(&counts(3, 1, 1)), CampaignStatus::Running);
        assert_eq!(derive_status(&counts(3, 0, 0)), CampaignStatus::Running);
    }

    #[test]
    fn test_derive_completed() {
        assert_eq!(derive_status(&counts(3, 3, 0)), CampaignStatus::Completed);
        // A mix of sent and failed still completes
        assert_eq!(derive_status(&counts(3, 2, 1)), CampaignStatus::Completed);
    }

    #[test]
    fn test_derive_failed_only_when_all_failed() {
        assert_eq!(derive_status(&counts(3, 0, 3)), CampaignStatus::Failed);
        assert_eq!(derive_status(&counts(3, 1, 2)), CampaignStatus::Completed);
    }

    #[test]
    fn test_derive_counts_stay_bounded() {
        let c = counts(5, 3, 2);
        assert!(c.sent + c.failed <= c.total);
        assert_eq!(c.pending(), 0);
        assert_eq!(derive_status(&c), CampaignStatus::Completed);
    }
}
