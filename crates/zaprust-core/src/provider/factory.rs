//! Provider client construction from stored configuration

use std::sync::Arc;
use tracing::warn;
use zaprust_common::types::ApiConfigId;
use zaprust_common::{Error, Result, TokenCipher};
use zaprust_storage::repository::ApiConfigRepository;

use super::client::{ProviderConfig, WhatsAppClient};

/// Builds provider clients from `api_configurations` rows
#[derive(Clone)]
pub struct ProviderFactory {
    api_config_repo: ApiConfigRepository,
    cipher: Arc<TokenCipher>,
    timeout_secs: u64,
}

impl ProviderFactory {
    /// Create a new provider factory
    pub fn new(
        api_config_repo: ApiConfigRepository,
        cipher: Arc<TokenCipher>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            api_config_repo,
            cipher,
            timeout_secs,
        }
    }

    /// Build a client for the given API configuration.
    ///
    /// Fails when the configuration is missing, inactive, has an unknown
    /// kind, or its token cannot be decrypted. The dispatch loop treats
    /// any of these as a send failure on the task.
    pub async fn create(&self, api_config_id: ApiConfigId) -> Result<WhatsAppClient> {
        let config = self
            .api_config_repo
            .get(api_config_id)
            .await
            .map_err(|e| Error::Database(format!("Failed to load API configuration: {}", e)))?
            .ok_or_else(|| {
                Error::NotFound(format!("API configuration {} not found", api_config_id))
            })?;

        if !config.is_active {
            return Err(Error::Validation(format!(
                "API configuration {} is not active",
                api_config_id
            )));
        }

        let kind = config.kind_enum().ok_or_else(|| {
            Error::Validation(format!("Unknown provider kind '{}'", config.api_kind))
        })?;

        let access_token = if TokenCipher::is_encrypted(&config.access_token) {
            self.cipher.decrypt(&config.access_token)?
        } else {
            // Rows imported before encryption was introduced
            warn!(
                api_config_id = %api_config_id,
                "API configuration holds a plaintext access token"
            );
            config.access_token.clone()
        };

        WhatsAppClient::new(ProviderConfig {
            kind,
            server_url: config.server_url,
            instance_name: config.instance_name,
            access_token,
            timeout_secs: self.timeout_secs,
        })
    }
}
