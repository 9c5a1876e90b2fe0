//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use zaprust_common::types::{ApiConfigId, CampaignId, ContactId, QueueTaskId, TenantId};

/// Campaign status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Draft => write!(f, "draft"),
            CampaignStatus::Scheduled => write!(f, "scheduled"),
            CampaignStatus::Running => write!(f, "running"),
            CampaignStatus::Paused => write!(f, "paused"),
            CampaignStatus::Completed => write!(f, "completed"),
            CampaignStatus::Failed => write!(f, "failed"),
            CampaignStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CampaignStatus::Draft),
            "scheduled" => Ok(CampaignStatus::Scheduled),
            "running" => Ok(CampaignStatus::Running),
            "paused" => Ok(CampaignStatus::Paused),
            "completed" => Ok(CampaignStatus::Completed),
            "failed" => Ok(CampaignStatus::Failed),
            "cancelled" => Ok(CampaignStatus::Cancelled),
            _ => Err(format!("Invalid campaign status: {}", s)),
        }
    }
}

/// Campaign model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    pub message_content: String,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub api_config_id: ApiConfigId,
    pub status: String,
    pub total_contacts: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Get status enum
    pub fn status_enum(&self) -> Option<CampaignStatus> {
        self.status.parse().ok()
    }

    /// Calculate progress percentage
    pub fn progress_percentage(&self) -> f64 {
        if self.total_contacts == 0 {
            0.0
        } else {
            ((self.sent_count + self.failed_count) as f64 / self.total_contacts as f64) * 100.0
        }
    }
}

/// Create campaign input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCampaign {
    pub tenant_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    pub message_content: String,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub api_config_id: ApiConfigId,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Contact status within a campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    Pending,
    Sent,
    Failed,
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContactStatus::Pending => write!(f, "pending"),
            ContactStatus::Sent => write!(f, "sent"),
            ContactStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ContactStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ContactStatus::Pending),
            "sent" => Ok(ContactStatus::Sent),
            "failed" => Ok(ContactStatus::Failed),
            _ => Err(format!("Invalid contact status: {}", s)),
        }
    }
}

/// Campaign contact model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CampaignContact {
    pub id: ContactId,
    pub campaign_id: CampaignId,
    pub phone: String,
    pub name: Option<String>,
    pub attributes: serde_json::Value,
    pub status: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CampaignContact {
    /// Get status enum
    pub fn status_enum(&self) -> Option<ContactStatus> {
        self.status.parse().ok()
    }
}

/// Create campaign contact input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContact {
    pub campaign_id: CampaignId,
    pub phone: String,
    pub name: Option<String>,
    pub attributes: Option<serde_json::Value>,
}

/// Queue task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueTaskStatus {
    Pending,
    Sending,
    Sent,
    Failed,
    Cancelled,
}

impl QueueTaskStatus {
    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueTaskStatus::Sent | QueueTaskStatus::Failed | QueueTaskStatus::Cancelled
        )
    }
}

impl std::fmt::Display for QueueTaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueTaskStatus::Pending => write!(f, "pending"),
            QueueTaskStatus::Sending => write!(f, "sending"),
            QueueTaskStatus::Sent => write!(f, "sent"),
            QueueTaskStatus::Failed => write!(f, "failed"),
            QueueTaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for QueueTaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QueueTaskStatus::Pending),
            "sending" => Ok(QueueTaskStatus::Sending),
            "sent" => Ok(QueueTaskStatus::Sent),
            "failed" => Ok(QueueTaskStatus::Failed),
            "cancelled" => Ok(QueueTaskStatus::Cancelled),
            _ => Err(format!("Invalid queue task status: {}", s)),
        }
    }
}

/// Queue task model - one queued delivery attempt for one contact
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QueueTask {
    pub id: QueueTaskId,
    pub campaign_id: CampaignId,
    pub contact_id: ContactId,
    pub contact_phone: String,
    pub contact_name: Option<String>,
    pub message_content: String,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub status: String,
    pub scheduled_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub provider_message_id: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QueueTask {
    /// Get status enum
    pub fn status_enum(&self) -> Option<QueueTaskStatus> {
        self.status.parse().ok()
    }
}

/// Create queue task input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQueueTask {
    pub campaign_id: CampaignId,
    pub contact_id: ContactId,
    pub contact_phone: String,
    pub contact_name: Option<String>,
    pub message_content: String,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub scheduled_at: DateTime<Utc>,
}

/// Per-campaign pacing configuration
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SendingConfiguration {
    pub campaign_id: CampaignId,
    pub min_delay_seconds: i32,
    pub max_delay_seconds: i32,
    pub pause_after_messages: i32,
    pub pause_duration_seconds: i32,
    pub max_retries: i32,
    pub daily_limit: Option<i32>,
    pub allowed_hours_start: Option<i32>,
    pub allowed_hours_end: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SendingConfiguration {
    /// Conservative defaults for campaigns created without explicit pacing
    pub fn defaults_for(campaign_id: CampaignId) -> Self {
        let now = Utc::now();
        Self {
            campaign_id,
            min_delay_seconds: 5,
            max_delay_seconds: 30,
            pause_after_messages: 0,
            pause_duration_seconds: 0,
            max_retries: 3,
            daily_limit: None,
            allowed_hours_start: None,
            allowed_hours_end: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Provider API kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKind {
    EvolutionWeb,
    EvolutionCloud,
    WhatsappCloud,
}

impl std::fmt::Display for ApiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiKind::EvolutionWeb => write!(f, "evolution_web"),
            ApiKind::EvolutionCloud => write!(f, "evolution_cloud"),
            ApiKind::WhatsappCloud => write!(f, "whatsapp_cloud"),
        }
    }
}

impl std::str::FromStr for ApiKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "evolution_web" => Ok(ApiKind::EvolutionWeb),
            "evolution_cloud" => Ok(ApiKind::EvolutionCloud),
            "whatsapp_cloud" => Ok(ApiKind::WhatsappCloud),
            _ => Err(format!("Invalid api kind: {}", s)),
        }
    }
}

/// Provider API configuration model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ApiConfiguration {
    pub id: ApiConfigId,
    pub tenant_id: TenantId,
    pub name: String,
    pub api_kind: String,
    pub server_url: String,
    pub instance_name: String,
    pub access_token: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiConfiguration {
    /// Get kind enum
    pub fn kind_enum(&self) -> Option<ApiKind> {
        self.api_kind.parse().ok()
    }
}

/// Create API configuration input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApiConfiguration {
    pub tenant_id: TenantId,
    pub name: String,
    pub api_kind: String,
    pub server_url: String,
    pub instance_name: String,
    pub access_token: String,
    pub is_active: bool,
}

/// Aggregate contact status counts for one campaign
#[derive(Debug, Clone, Default)]
pub struct ContactStatusCounts {
    pub total: i64,
    pub sent: i64,
    pub failed: i64,
}

impl ContactStatusCounts {
    /// Contacts not yet terminally resolved
    pub fn pending(&self) -> i64 {
        self.total - self.sent - self.failed
    }
}

/// Aggregate queue task counts across campaigns
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStatusCounts {
    pub pending: i64,
    pub sending: i64,
    pub sent: i64,
    pub failed: i64,
    pub cancelled: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_status_roundtrip() {
        for status in [
            CampaignStatus::Draft,
            CampaignStatus::Scheduled,
            CampaignStatus::Running,
            CampaignStatus::Paused,
            CampaignStatus::Completed,
            CampaignStatus::Failed,
            CampaignStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<CampaignStatus>().unwrap(), status);
        }
        assert!("sending".parse::<CampaignStatus>().is_err());
    }

    #[test]
    fn test_queue_task_status_terminal() {
        assert!(!QueueTaskStatus::Pending.is_terminal());
        assert!(!QueueTaskStatus::Sending.is_terminal());
        assert!(QueueTaskStatus::Sent.is_terminal());
        assert!(QueueTaskStatus::Failed.is_terminal());
        assert!(QueueTaskStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_api_kind_roundtrip() {
        for kind in [
            ApiKind::EvolutionWeb,
            ApiKind::EvolutionCloud,
            ApiKind::WhatsappCloud,
        ] {
            assert_eq!(kind.to_string().parse::<ApiKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_contact_counts_pending() {
        let counts = ContactStatusCounts {
            total: 10,
            sent: 4,
            failed: 1,
        };
        assert_eq!(counts.pending(), 5);
    }
}
