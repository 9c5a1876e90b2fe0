//! Shared application state

use std::sync::Arc;
use zaprust_common::TokenCipher;
use zaprust_core::{CampaignManager, ProviderFactory, QueueProcessor};
use zaprust_storage::DatabasePool;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabasePool,
    pub processor: Arc<QueueProcessor>,
    pub campaign_manager: Arc<CampaignManager>,
    pub provider_factory: ProviderFactory,
    pub cipher: Arc<TokenCipher>,
}
