//! Database queries for the training API.
//!
//! This module contains database query functions organized by domain.
//! Functions over tenant tables take a `&mut PgConnection` from a
//! plant-scoped transaction; the rest take the pool.

pub mod analytics;
pub mod content;
pub mod course;
pub mod enrollment;
pub mod event;
pub mod plant;
pub mod profile;
pub mod progress;
