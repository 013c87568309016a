//! Configuration module for the training API server.
//!
//! This module provides configuration loading from environment variables
//! using the `envy` crate for type-safe environment variable parsing.

mod app;
mod auth;
mod database;

pub use app::AppConfig;
pub use auth::AuthConfig;
pub use database::DatabaseConfig;
