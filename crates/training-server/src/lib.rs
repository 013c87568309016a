//! SpecChem Safety Training Library
//!
//! This crate provides the backend for the plant safety training program,
//! handling:
//!
//! - **Course Delivery**: Published courses with sections, content blocks,
//!   quizzes and per-locale translations
//! - **Enrollment**: Self-enrollment and bulk assignment by HR
//! - **Progress Tracking**: Monotonic per-course progress and completion
//! - **Learner Events**: Activity events and graded quiz answers
//! - **Administration**: Plants, users, roles, course authoring and analytics
//!
//! ## Architecture
//!
//! Authentication is delegated to a hosted auth provider; the server
//! resolves each access token to a training profile and its admin roles.
//! Every plant-owned row is isolated with PostgreSQL row-level security,
//! enforced through plant-scoped transactions.
//!
//! ## Modules
//!
//! - [`auth`]: Session middleware and user context
//! - [`config`]: Configuration loading from environment variables
//! - [`db`]: Database connectivity, schema, models and queries
//! - [`error`]: Custom error types with Axum integration
//! - [`handlers`]: HTTP route handlers
//! - [`router`]: Route table
//! - [`services`]: Business rules per domain
//! - [`state`]: Shared application state
//!
//! ## Example
//!
//! ```ignore
//! use specchem_training::{
//!     auth::AuthState,
//!     config::{AppConfig, AuthConfig, DatabaseConfig},
//!     db::create_pool,
//!     router::build_router,
//!     state::{AppState, Services},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app_config = AppConfig::from_env()?;
//!     let db_pool = create_pool(&DatabaseConfig::from_env()?, &app_config.schema).await?;
//!     let auth = AuthState::new(AuthConfig::from_env()?, db_pool.clone())?;
//!     let services = Services::new(db_pool.clone(), auth.sessions.clone());
//!     let app = build_router(AppState::new(db_pool, app_config), services, auth);
//!     // ... serve app
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod result_ext;
pub mod router;
pub mod services;
pub mod state;
pub mod validation;

pub use error::{AppError, AppResult};
pub use result_ext::ResultExt;
