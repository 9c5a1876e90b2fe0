//! ZapRust Common - Shared types, configuration, and error handling
//!
//! This crate provides the pieces every other ZapRust crate depends on:
//! the workspace error type, the TOML configuration model, shared
//! identifiers, phone-number normalization, and the provider-token cipher.

pub mod config;
pub mod error;
pub mod secrets;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use secrets::TokenCipher;
