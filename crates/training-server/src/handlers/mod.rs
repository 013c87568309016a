//! HTTP handlers for the training API.
//!
//! This module contains all route handlers organized by audience.

pub mod admin;
pub mod health;
pub mod learner;
pub mod system;

pub use health::{api_health, health_check};
