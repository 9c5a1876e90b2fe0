//! Common types for ZapRust

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for tenants
pub type TenantId = Uuid;

/// Unique identifier for campaigns
pub type CampaignId = Uuid;

/// Unique identifier for campaign contacts
pub type ContactId = Uuid;

/// Unique identifier for queued message tasks
pub type QueueTaskId = Uuid;

/// Unique identifier for provider API configurations
pub type ApiConfigId = Uuid;

/// WhatsApp phone number
///
/// Stored as bare digits (country code included, no `+` or separators).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse a phone number from user input, stripping formatting characters
    pub fn parse(s: &str) -> Option<Self> {
        let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
        // Country code + subscriber number; anything shorter is garbage
        if digits.len() >= 8 && digits.len() <= 15 {
            Some(Self(digits))
        } else {
            None
        }
    }

    /// Get the bare digit form (E.164 without the `+`)
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// Get the gateway JID form used by self-hosted gateways
    pub fn whatsapp_jid(&self) -> String {
        if self.0.contains('@') {
            self.0.clone()
        } else {
            format!("{}@s.whatsapp.net", self.0)
        }
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::Error::Validation("Invalid phone number".to_string()))
    }
}

/// Media attachment kind for outbound messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Document => write!(f, "document"),
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            "document" => Ok(MediaKind::Document),
            _ => Err(format!("Invalid media kind: {}", s)),
        }
    }
}

/// Timestamp wrapper
pub type Timestamp = DateTime<Utc>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_number_parse() {
        let phone = PhoneNumber::parse("+55 11 91234-5678").unwrap();
        assert_eq!(phone.digits(), "5511912345678");
        assert_eq!(phone.whatsapp_jid(), "5511912345678@s.whatsapp.net");
    }

    #[test]
    fn test_phone_number_invalid() {
        assert!(PhoneNumber::parse("12345").is_none());
        assert!(PhoneNumber::parse("not a number").is_none());
        assert!(PhoneNumber::parse("12345678901234567890").is_none());
    }

    #[test]
    fn test_media_kind_roundtrip() {
        for kind in [
            MediaKind::Image,
            MediaKind::Video,
            MediaKind::Audio,
            MediaKind::Document,
        ] {
            assert_eq!(kind.to_string().parse::<MediaKind>().unwrap(), kind);
        }
        assert!("gif".parse::<MediaKind>().is_err());
    }
}
