//! ZapRust - Campaign dispatch server entry point

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zaprust_api::AppState;
use zaprust_common::{Config, TokenCipher};
use zaprust_core::{CampaignManager, ProviderFactory, QueueProcessor};
use zaprust_storage::db::DatabasePool;
use zaprust_storage::repository::ApiConfigRepository;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting ZapRust server...");

    // Load configuration
    let config = Config::load()?;

    // Initialize database
    let db_pool = DatabasePool::new(&config.database).await?;

    // Run migrations
    db_pool.migrate().await?;

    // Provider token cipher
    let token_key = config.secrets.resolve_token_key()?;
    let cipher = Arc::new(TokenCipher::from_base64_key(&token_key)?);

    // Provider client factory
    let provider_factory = ProviderFactory::new(
        ApiConfigRepository::new(db_pool.pool().clone()),
        cipher.clone(),
        config.dispatch.send_timeout_secs,
    );

    // Campaign manager
    let campaign_manager = Arc::new(CampaignManager::new(db_pool.clone()));

    // Queue processor
    let processor = Arc::new(QueueProcessor::new(
        db_pool.clone(),
        provider_factory.clone(),
        campaign_manager.clone(),
        config.dispatch.clone(),
    ));

    // Start the dispatch loop
    let processor_handle = {
        let processor = processor.clone();
        tokio::spawn(async move {
            processor.run().await;
        })
    };

    // Start API server
    let api_handle = {
        let state = Arc::new(AppState {
            db_pool: db_pool.clone(),
            processor: processor.clone(),
            campaign_manager: campaign_manager.clone(),
            provider_factory,
            cipher: cipher.clone(),
        });
        let bind = format!("{}:{}", config.server.bind_address, config.api.port);

        tokio::spawn(async move {
            let app = zaprust_api::create_router(state);
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .expect("Failed to bind API server");
            info!("Starting API server on {}", bind);
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("API server error: {}", e);
            }
        })
    };

    info!("ZapRust server started successfully");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Stop accepting new ticks, then tear down
    processor.stop();
    processor_handle.abort();
    api_handle.abort();

    info!("ZapRust server shutdown complete");

    Ok(())
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,zaprust=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true))
        .with(filter)
        .init();
}
