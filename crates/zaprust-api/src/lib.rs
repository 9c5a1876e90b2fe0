//! ZapRust API - REST interface for campaign and queue control

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
