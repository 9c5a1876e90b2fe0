//! ZapRust Storage - Database access layer
//!
//! This crate provides the PostgreSQL pool, row models, and repositories
//! for campaigns, contacts, the message queue, and provider/pacing
//! configuration.

pub mod db;
pub mod models;
pub mod repository;

pub use db::{Database, DatabasePool};
pub use models::*;
pub use repository::*;
