//! ZapRust Core - Campaign dispatch engine
//!
//! This crate provides the core behavior of ZapRust: the WhatsApp provider
//! client abstraction, the message template renderer, campaign lifecycle
//! management, campaign progress aggregation, and the queue processor that
//! drains the message queue.

pub mod dispatch;
pub mod provider;

pub use dispatch::manager::{CampaignError, CampaignManager};
pub use dispatch::processor::{QueueProcessor, TickSummary};
pub use dispatch::progress::ProgressTracker;
pub use dispatch::template::TemplateRenderer;
pub use provider::{ProviderFactory, SendOutcome, WhatsAppClient};
