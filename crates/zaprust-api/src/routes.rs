//! API routes

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{api_configs, campaigns, contacts, health, pacing, queue};
use crate::state::AppState;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Health check routes
    let health_routes = Router::new()
        .route("/", get(health::health))
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        .route("/detailed", get(health::health_detailed));

    // Queue control routes - the dispatch trigger surface
    let queue_routes = Router::new()
        .route("/process", post(queue::process_now))
        .route("/start", post(queue::start_processor))
        .route("/stop", post(queue::stop_processor))
        .route("/stats", get(queue::queue_stats));

    // Campaign routes
    let campaign_routes = Router::new()
        .route("/", get(campaigns::list_campaigns))
        .route("/", post(campaigns::create_campaign))
        .route("/:campaign_id", get(campaigns::get_campaign))
        .route("/:campaign_id", delete(campaigns::delete_campaign))
        .route("/:campaign_id/start", post(campaigns::start_campaign))
        .route("/:campaign_id/schedule", post(campaigns::schedule_campaign))
        .route("/:campaign_id/pause", post(campaigns::pause_campaign))
        .route("/:campaign_id/resume", post(campaigns::resume_campaign))
        .route("/:campaign_id/cancel", post(campaigns::cancel_campaign))
        .route("/:campaign_id/stats", get(campaigns::get_campaign_stats))
        .route("/:campaign_id/tasks", get(campaigns::list_campaign_tasks))
        .route("/:campaign_id/contacts", post(contacts::import_contacts))
        .route("/:campaign_id/contacts", get(contacts::list_contacts))
        .route("/:campaign_id/pacing", get(pacing::get_pacing))
        .route("/:campaign_id/pacing", put(pacing::set_pacing));

    // Provider configuration routes
    let api_config_routes = Router::new()
        .route("/", get(api_configs::list_api_configs))
        .route("/", post(api_configs::create_api_config))
        .route("/:config_id/test", post(api_configs::test_api_config))
        .route("/:config_id/token", put(api_configs::rotate_token));

    Router::new()
        .nest("/health", health_routes)
        .nest("/api/v1/queue", queue_routes)
        .nest("/api/v1/tenants/:tenant_id/campaigns", campaign_routes)
        .nest("/api/v1/tenants/:tenant_id/api-configs", api_config_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
