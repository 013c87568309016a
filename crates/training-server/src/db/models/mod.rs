//! Database models for the training API.
//!
//! This module contains SQLx-compatible row definitions for all
//! tables plus the request/response DTOs built from them.

pub mod analytics;
pub mod common;
pub mod content;
pub mod course;
pub mod enrollment;
pub mod event;
pub mod plant;
pub mod profile;
pub mod progress;

pub use analytics::*;
pub use common::*;
pub use content::*;
pub use course::*;
pub use enrollment::*;
pub use event::*;
pub use plant::*;
pub use profile::*;
pub use progress::*;
