//! Repository layer for data access

pub mod api_configs;
pub mod campaigns;
pub mod contacts;
pub mod message_queue;
pub mod sending_configs;

pub use api_configs::ApiConfigRepository;
pub use campaigns::CampaignRepository;
pub use contacts::ContactRepository;
pub use message_queue::MessageQueueRepository;
pub use sending_configs::SendingConfigRepository;
