//! Session authentication.
//!
//! Access tokens are issued by the hosted auth provider. The middleware
//! resolves a token to a [`UserContext`] (provider user + training profile
//! + admin roles) and caches it for the session TTL.

pub mod middleware;
pub mod provider;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

pub use middleware::auth_middleware;
pub use provider::AuthProvider;
pub use types::UserContext;

use crate::cache::TtlCache;
use crate::config::AuthConfig;
use crate::db::DbPool;
use crate::error::AppResult;

/// Resolved sessions keyed by access token.
pub type SessionCache = TtlCache<String, UserContext>;

/// Combined state for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    pub provider: Arc<AuthProvider>,
    pub sessions: SessionCache,
    pub db: DbPool,
    pub config: Arc<AuthConfig>,
}

impl AuthState {
    pub fn new(config: AuthConfig, db: DbPool) -> AppResult<Self> {
        let provider = AuthProvider::new(&config)?;
        let sessions = TtlCache::new(Duration::from_secs(config.session_ttl_secs));

        Ok(Self {
            provider: Arc::new(provider),
            sessions,
            db,
            config: Arc::new(config),
        })
    }
}
