//! Database module for the training API.
//!
//! This module provides database connectivity, models, queries,
//! the embedded schema and plant-scoped transactions for PostgreSQL
//! using SQLx.

pub mod models;
pub mod pool;
pub mod queries;
pub mod schema;
pub mod tenant;

#[cfg(test)]
pub(crate) mod testing;

pub use pool::{create_lazy_pool, create_pool, DbPool};
pub use tenant::{begin_scoped, PlantScope, ScopedTx};
